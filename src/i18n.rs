//! Status-text catalog for the workflow controller.
//!
//! The advisory strings shown to farmers are Bengali in production
//! deployments; which catalog is used is a configuration choice, not
//! hard-coded behavior.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Bn,
}

impl Locale {
    /// Parse a locale tag, falling back to English for unknown tags.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "bn" => Locale::Bn,
            _ => Locale::En,
        }
    }
}

/// Every status string the workflow controller can emit.
#[derive(Debug)]
pub struct Messages {
    pub image_loaded: &'static str,
    pub cropping: &'static str,
    pub crop_done: &'static str,
    pub crop_failed: &'static str,
    predicting_prefix: &'static str,
    pub prediction_done: &'static str,
    pub prediction_failed: &'static str,
    pub advice_loading: &'static str,
    pub advice_done: &'static str,
    pub advice_failed: &'static str,
    pub advice_no_answer: &'static str,
    pub forwarding: &'static str,
    pub forward_done: &'static str,
    pub forward_failed: &'static str,
}

static EN: Messages = Messages {
    image_loaded: "Image loaded. Adjust crop and crop the leaf.",
    cropping: "Cropping…",
    crop_done: "Cropped ✅ Now run prediction.",
    crop_failed: "Crop failed.",
    predicting_prefix: "Predicting",
    prediction_done: "Prediction done ✅",
    prediction_failed: "Prediction failed",
    advice_loading: "Loading advice…",
    advice_done: "Done ✅",
    advice_failed: "AI advice failed ❌",
    advice_no_answer: "No answer received",
    forwarding: "Forwarding to govt officer…",
    forward_done: "Forwarded ✅",
    forward_failed: "Forward failed",
};

static BN: Messages = Messages {
    image_loaded: "ছবি লোড হয়েছে। ক্রপ ঠিক করে পাতাটি ক্রপ করুন।",
    cropping: "ক্রপ হচ্ছে…",
    crop_done: "ক্রপ সম্পন্ন ✅ এবার প্রেডিক্ট করুন।",
    crop_failed: "ক্রপ ব্যর্থ হয়েছে।",
    predicting_prefix: "প্রেডিক্ট হচ্ছে",
    prediction_done: "প্রেডিকশন সম্পন্ন ✅",
    prediction_failed: "প্রেডিকশন ব্যর্থ হয়েছে",
    advice_loading: "লোড হচ্ছে...",
    advice_done: "সম্পন্ন ✅",
    advice_failed: "ব্যর্থ ❌",
    advice_no_answer: "কোনো উত্তর পাওয়া যায়নি",
    forwarding: "সরকারি কর্মকর্তার কাছে পাঠানো হচ্ছে…",
    forward_done: "পাঠানো হয়েছে ✅",
    forward_failed: "পাঠানো ব্যর্থ হয়েছে",
};

impl Messages {
    pub fn for_locale(locale: Locale) -> &'static Messages {
        match locale {
            Locale::En => &EN,
            Locale::Bn => &BN,
        }
    }

    pub fn predicting(&self, crop_species: &str) -> String {
        format!("{} ({})…", self.predicting_prefix, crop_species)
    }
}
