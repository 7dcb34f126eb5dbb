//! Localized prompt catalog for the onboarding conversation.
//!
//! English is the fallback language and is total over every key; other
//! languages may omit keys and fall back per key.

use super::model::{Language, PatientProfile};
use super::state::OnboardingStep;

/// Language every key is guaranteed to exist in.
pub const FALLBACK_LANGUAGE: Language = Language::English;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    /// The question asked at a step.
    Step(OnboardingStep),
    /// Appended to the emergency-contact question when skipping is allowed.
    SkipHint,
    NotUnderstood,
    /// Template with a `{name}` placeholder, followed by the profile summary.
    Completed,
    AlreadyRegistered,
    TryAgainLater,
    Restarted,
    RestartAfterError,
}

/// Prompt text for `key` in `language`, if that language has it.
pub fn lookup(key: PromptKey, language: Language) -> Option<&'static str> {
    match language {
        Language::English => Some(english(key)),
        Language::Hindi => hindi(key),
        Language::Marathi => marathi(key),
    }
}

/// Prompt text for `key`, falling back to English.
pub fn prompt(key: PromptKey, language: Language) -> &'static str {
    lookup(key, language).unwrap_or_else(|| english(key))
}

/// The question for `step`, with the skip hint where it applies.
pub fn step_prompt(step: OnboardingStep, language: Language, allow_skip: bool) -> String {
    let question = prompt(PromptKey::Step(step), language);
    if step == OnboardingStep::EmergencyContact && allow_skip {
        format!("{question}\n{}", prompt(PromptKey::SkipHint, language))
    } else {
        question.to_string()
    }
}

/// Text for any key; step keys get the skip hint where it applies.
pub fn render(key: PromptKey, language: Language, allow_skip: bool) -> String {
    match key {
        PromptKey::Step(step) => step_prompt(step, language, allow_skip),
        other => prompt(other, language).to_string(),
    }
}

/// A notice followed by the question for `step`.
pub fn notice_then_step(
    notice: PromptKey,
    step: OnboardingStep,
    language: Language,
    allow_skip: bool,
) -> String {
    format!(
        "{}\n\n{}",
        prompt(notice, language),
        step_prompt(step, language, allow_skip)
    )
}

/// "Didn't understand" followed by the original question.
pub fn reprompt(step: OnboardingStep, language: Language, allow_skip: bool) -> String {
    notice_then_step(PromptKey::NotUnderstood, step, language, allow_skip)
}

/// Completion message with the profile summary.
pub fn completion_message(profile: &PatientProfile) -> String {
    let header = prompt(PromptKey::Completed, profile.language).replace("{name}", &profile.name);
    format!("{header}\n\n{}", profile.summary())
}

fn english(key: PromptKey) -> &'static str {
    use OnboardingStep as S;

    match key {
        PromptKey::Step(S::Language) => "\
🙏 Welcome to Gluco Sahayak, your diabetes care companion!

Please choose your language:
1. English
2. हिंदी (Hindi)
3. मराठी (Marathi)

Reply with the number.",
        PromptKey::Step(S::Name) => "What is your full name?",
        PromptKey::Step(S::Age) => "How old are you? (in years, e.g. 45)",
        PromptKey::Step(S::Gender) => "What is your gender?\n1. Male\n2. Female\n3. Other",
        PromptKey::Step(S::EmergencyContact) => {
            "Please share the 10-digit mobile number of an emergency contact (e.g. 9876543210)."
        }
        PromptKey::Step(S::Pincode) => "What is your area pincode? (6 digits)",
        PromptKey::Step(S::Consent) => "\
Gluco Sahayak will store your health details to send you personalised diabetes guidance and reminders. This does not replace your doctor's advice.

Do you agree?
1. Yes
2. No",
        PromptKey::Step(S::DiabetesType) => "\
Which type of diabetes do you have?
1. Type 1
2. Type 2
3. Gestational (during pregnancy)
4. Prediabetes",
        PromptKey::Step(S::Duration) => {
            "How many years ago were you diagnosed? (e.g. 5, or \"6 months\")"
        }
        PromptKey::Step(S::MedicationType) => "\
What medication do you take for diabetes?
1. Tablets
2. Insulin
3. Both
4. None",
        PromptKey::Step(S::MedicineNames) => {
            "Please list the names of your diabetes medicines (e.g. Metformin, Glimepiride)."
        }
        PromptKey::Step(S::Diet) => {
            "What is your diet preference?\n1. Vegetarian\n2. Non-vegetarian\n3. Eggetarian"
        }
        PromptKey::Step(S::Comorbidities) => {
            "Do you have any other health conditions? (e.g. BP, thyroid, heart or kidney problems). Reply \"none\" if not."
        }
        PromptKey::Step(S::HbA1c) => {
            "What was your last HbA1c value? (e.g. 7.5). Reply \"don't know\" if you are not sure."
        }
        PromptKey::SkipHint => "Reply \"skip\" if you prefer not to share one.",
        PromptKey::NotUnderstood => "Sorry, I didn't understand that.",
        PromptKey::Completed => {
            "✅ Thank you, {name}! Your profile is set up. Here is what I have:"
        }
        PromptKey::AlreadyRegistered => {
            "You are already registered with Gluco Sahayak. Send me your sugar readings or ask any diabetes question anytime."
        }
        PromptKey::TryAgainLater => {
            "Sorry, something went wrong on our side. Please send your answer again in a moment."
        }
        PromptKey::Restarted => "Okay, let's start again from the beginning.",
        PromptKey::RestartAfterError => {
            "Sorry, something went wrong with your registration. Let's start again from the beginning."
        }
    }
}

fn hindi(key: PromptKey) -> Option<&'static str> {
    use OnboardingStep as S;

    let text = match key {
        PromptKey::Step(S::Language) => "\
🙏 ग्लूको सहायक में आपका स्वागत है, आपका डायबिटीज़ साथी!

कृपया अपनी भाषा चुनें:
1. English
2. हिंदी
3. मराठी

नंबर लिखकर जवाब दें।",
        PromptKey::Step(S::Name) => "आपका पूरा नाम क्या है?",
        PromptKey::Step(S::Age) => "आपकी उम्र कितनी है? (सालों में, जैसे 45)",
        PromptKey::Step(S::Gender) => "आपका लिंग क्या है?\n1. पुरुष\n2. महिला\n3. अन्य",
        PromptKey::Step(S::EmergencyContact) => {
            "कृपया किसी आपातकालीन संपर्क का 10 अंकों का मोबाइल नंबर भेजें (जैसे 9876543210)।"
        }
        PromptKey::Step(S::Pincode) => "आपके क्षेत्र का पिनकोड क्या है? (6 अंक)",
        PromptKey::Step(S::Consent) => "\
ग्लूको सहायक आपको व्यक्तिगत डायबिटीज़ सलाह और रिमाइंडर भेजने के लिए आपकी स्वास्थ्य जानकारी सुरक्षित रखेगा। यह डॉक्टर की सलाह का विकल्प नहीं है।

क्या आप सहमत हैं?
1. हाँ
2. नहीं",
        PromptKey::Step(S::DiabetesType) => "\
आपको किस प्रकार की डायबिटीज़ है?
1. टाइप 1
2. टाइप 2
3. गर्भावस्था में (जेस्टेशनल)
4. प्री-डायबिटीज़",
        PromptKey::Step(S::Duration) => {
            "आपको डायबिटीज़ कितने साल पहले पता चली? (जैसे 5, या \"6 महीने\")"
        }
        PromptKey::Step(S::MedicationType) => "\
आप डायबिटीज़ के लिए कौन सी दवा लेते हैं?
1. गोलियां
2. इंसुलिन
3. दोनों
4. कोई नहीं",
        PromptKey::Step(S::MedicineNames) => {
            "कृपया अपनी डायबिटीज़ की दवाइयों के नाम लिखें (जैसे Metformin, Glimepiride)।"
        }
        PromptKey::Step(S::Diet) => "आपका आहार कैसा है?\n1. शाकाहारी\n2. मांसाहारी\n3. अंडा खाने वाले",
        PromptKey::Step(S::Comorbidities) => {
            "क्या आपको कोई और बीमारी है? (जैसे बीपी, थायराइड, दिल या किडनी की समस्या)। अगर नहीं तो \"none\" लिखें।"
        }
        PromptKey::Step(S::HbA1c) => {
            "आपका पिछला HbA1c कितना था? (जैसे 7.5)। पता न हो तो \"पता नहीं\" लिखें।"
        }
        PromptKey::SkipHint => "अगर आप नहीं देना चाहते तो \"skip\" लिखें।",
        PromptKey::NotUnderstood => "माफ़ कीजिए, मैं समझ नहीं पाया।",
        PromptKey::Completed => "✅ धन्यवाद, {name}! आपकी प्रोफ़ाइल तैयार है। आपकी जानकारी:",
        PromptKey::AlreadyRegistered => {
            "आप पहले से ग्लूको सहायक में पंजीकृत हैं। अपनी शुगर रीडिंग भेजें या डायबिटीज़ से जुड़ा कोई भी सवाल पूछें।"
        }
        PromptKey::TryAgainLater => {
            "माफ़ कीजिए, हमारी तरफ़ से कुछ गड़बड़ हुई। कृपया थोड़ी देर बाद अपना जवाब फिर से भेजें।"
        }
        PromptKey::Restarted => "ठीक है, चलिए शुरू से शुरू करते हैं।",
        PromptKey::RestartAfterError => {
            "माफ़ कीजिए, आपके पंजीकरण में कुछ गड़बड़ हुई। चलिए शुरू से शुरू करते हैं।"
        }
    };
    Some(text)
}

fn marathi(key: PromptKey) -> Option<&'static str> {
    use OnboardingStep as S;

    let text = match key {
        PromptKey::Step(S::Language) => "\
🙏 ग्लुको सहायकमध्ये आपले स्वागत आहे, तुमचा मधुमेह साथी!

कृपया तुमची भाषा निवडा:
1. English
2. हिंदी
3. मराठी

क्रमांक लिहून उत्तर द्या.",
        PromptKey::Step(S::Name) => "तुमचे पूर्ण नाव काय आहे?",
        PromptKey::Step(S::Age) => "तुमचे वय किती आहे? (वर्षांमध्ये, उदा. 45)",
        PromptKey::Step(S::Gender) => "तुमचे लिंग काय आहे?\n1. पुरुष\n2. स्त्री\n3. इतर",
        PromptKey::Step(S::EmergencyContact) => {
            "कृपया आपत्कालीन संपर्कासाठी 10 अंकी मोबाइल नंबर पाठवा (उदा. 9876543210)."
        }
        PromptKey::Step(S::Pincode) => "तुमच्या भागाचा पिनकोड काय आहे? (6 अंक)",
        PromptKey::Step(S::Consent) => "\
ग्लुको सहायक तुम्हाला वैयक्तिक मधुमेह मार्गदर्शन आणि स्मरणपत्रे पाठवण्यासाठी तुमची आरोग्य माहिती जतन करेल. हे डॉक्टरांच्या सल्ल्याला पर्याय नाही.

तुम्ही सहमत आहात का?
1. होय
2. नाही",
        PromptKey::Step(S::DiabetesType) => "\
तुम्हाला कोणत्या प्रकारचा मधुमेह आहे?
1. टाइप 1
2. टाइप 2
3. गर्भधारणेदरम्यान (जेस्टेशनल)
4. प्री-डायबिटीज",
        PromptKey::Step(S::Duration) => {
            "मधुमेहाचे निदान किती वर्षांपूर्वी झाले? (उदा. 5, किंवा \"6 महिने\")"
        }
        PromptKey::Step(S::MedicationType) => "\
तुम्ही मधुमेहासाठी कोणते औषध घेता?
1. गोळ्या
2. इन्सुलिन
3. दोन्ही
4. काहीही नाही",
        PromptKey::Step(S::MedicineNames) => {
            "कृपया तुमच्या मधुमेहाच्या औषधांची नावे लिहा (उदा. Metformin, Glimepiride)."
        }
        PromptKey::Step(S::Diet) => "तुमचा आहार कसा आहे?\n1. शाकाहारी\n2. मांसाहारी\n3. अंडी खाणारे",
        PromptKey::Step(S::Comorbidities) => {
            "तुम्हाला इतर कोणते आजार आहेत का? (उदा. बीपी, थायरॉईड, हृदय किंवा किडनीचा त्रास). नसल्यास \"none\" लिहा."
        }
        PromptKey::Step(S::HbA1c) => {
            "तुमचा मागील HbA1c किती होता? (उदा. 7.5). माहित नसल्यास \"माहित नाही\" लिहा."
        }
        PromptKey::SkipHint => "द्यायचा नसेल तर \"skip\" लिहा.",
        PromptKey::NotUnderstood => "माफ करा, मला समजले नाही.",
        PromptKey::Completed => "✅ धन्यवाद, {name}! तुमची प्रोफाइल तयार आहे. तुमची माहिती:",
        PromptKey::AlreadyRegistered => {
            "तुम्ही आधीच ग्लुको सहायकमध्ये नोंदणीकृत आहात. तुमची शुगर रीडिंग पाठवा किंवा मधुमेहाबद्दल कोणताही प्रश्न विचारा."
        }
        PromptKey::Restarted => "ठीक आहे, पुन्हा सुरुवातीपासून सुरू करूया.",
        PromptKey::TryAgainLater | PromptKey::RestartAfterError => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_keys() -> Vec<PromptKey> {
        let mut keys: Vec<PromptKey> = OnboardingStep::ALL.into_iter().map(PromptKey::Step).collect();
        keys.extend([
            PromptKey::SkipHint,
            PromptKey::NotUnderstood,
            PromptKey::Completed,
            PromptKey::AlreadyRegistered,
            PromptKey::TryAgainLater,
            PromptKey::Restarted,
            PromptKey::RestartAfterError,
        ]);
        keys
    }

    #[test]
    fn render_adds_skip_hint_only_to_step_keys() {
        let step = PromptKey::Step(OnboardingStep::EmergencyContact);
        assert_eq!(
            render(step, Language::Hindi, true),
            step_prompt(OnboardingStep::EmergencyContact, Language::Hindi, true)
        );
        assert!(render(step, Language::English, true).contains(english(PromptKey::SkipHint)));
        assert!(!render(step, Language::English, false).contains(english(PromptKey::SkipHint)));
        assert_eq!(
            render(PromptKey::TryAgainLater, Language::Marathi, true),
            prompt(PromptKey::TryAgainLater, Language::Marathi)
        );
    }

    #[test]
    fn fallback_language_is_total() {
        for key in all_keys() {
            let text = lookup(key, FALLBACK_LANGUAGE);
            assert!(text.is_some_and(|t| !t.is_empty()), "{key:?} missing");
        }
    }

    #[test]
    fn every_language_resolves_every_key() {
        for lang in Language::ALL {
            for key in all_keys() {
                assert!(!prompt(key, lang).is_empty(), "{key:?}/{lang} empty");
            }
        }
    }

    #[test]
    fn missing_marathi_key_falls_back_to_english() {
        assert!(lookup(PromptKey::TryAgainLater, Language::Marathi).is_none());
        assert_eq!(
            prompt(PromptKey::TryAgainLater, Language::Marathi),
            english(PromptKey::TryAgainLater)
        );
    }

    #[test]
    fn hindi_prompts_are_localized() {
        assert_ne!(
            prompt(PromptKey::Step(OnboardingStep::Name), Language::Hindi),
            prompt(PromptKey::Step(OnboardingStep::Name), Language::English)
        );
    }

    #[test]
    fn reprompt_contains_original_question() {
        for lang in Language::ALL {
            for step in OnboardingStep::ALL {
                let text = reprompt(step, lang, true);
                assert!(text.starts_with(prompt(PromptKey::NotUnderstood, lang)));
                assert!(text.contains(prompt(PromptKey::Step(step), lang)));
            }
        }
    }

    #[test]
    fn skip_hint_only_on_emergency_contact_when_allowed() {
        let hint = prompt(PromptKey::SkipHint, Language::English);
        assert!(step_prompt(OnboardingStep::EmergencyContact, Language::English, true).contains(hint));
        assert!(!step_prompt(OnboardingStep::EmergencyContact, Language::English, false).contains(hint));
        assert!(!step_prompt(OnboardingStep::Pincode, Language::English, true).contains(hint));
    }

    #[test]
    fn welcome_lists_all_languages() {
        let welcome = prompt(PromptKey::Step(OnboardingStep::Language), Language::English);
        assert!(welcome.contains("English"));
        assert!(welcome.contains("हिंदी"));
        assert!(welcome.contains("मराठी"));
    }
}
