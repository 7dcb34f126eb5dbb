//! Field parsers turning raw answer text into validated, typed values.
//!
//! Every parser is total: unparseable input yields `None`, which the manager
//! turns into a re-prompt. Free-text list parsers never return `None`.
//!
//! Menu choices accept ASCII or Devanagari digits. ASCII keywords match whole
//! words (case-insensitive); Devanagari keywords match as substrings. A
//! keyword with a negation attached ("no egg", "गोली नहीं") does not match.
//! Only ASCII digits count as numbers.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::model::{
    DiabetesType, DietPreference, EmergencyContact, FieldValue, Gender, HbA1cReading, Language,
    MedicationType, NONE_SENTINEL,
};
use super::state::OnboardingStep;

/// Knobs that change what parsers accept.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Accept "skip" at the emergency-contact step.
    pub allow_emergency_skip: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            allow_emergency_skip: true,
        }
    }
}

/// Run the parser for `step` against `text`.
pub fn parse_field(step: OnboardingStep, text: &str, options: &ParserOptions) -> Option<FieldValue> {
    let text = text.trim();
    match step {
        OnboardingStep::Language => parse_language(text).map(FieldValue::Language),
        OnboardingStep::Name => parse_name(text).map(FieldValue::Name),
        OnboardingStep::Age => parse_age(text).map(FieldValue::Age),
        OnboardingStep::Gender => parse_gender(text).map(FieldValue::Gender),
        OnboardingStep::EmergencyContact => {
            if options.allow_emergency_skip && is_skip(text) {
                return Some(FieldValue::EmergencyContact(EmergencyContact::Skipped));
            }
            parse_phone(text).map(|n| FieldValue::EmergencyContact(EmergencyContact::Number(n)))
        }
        OnboardingStep::Pincode => parse_pincode(text).map(FieldValue::Pincode),
        OnboardingStep::Consent => parse_consent(text).map(FieldValue::Consent),
        OnboardingStep::DiabetesType => parse_diabetes_type(text).map(FieldValue::DiabetesType),
        OnboardingStep::Duration => parse_duration_years(text).map(FieldValue::DurationYears),
        OnboardingStep::MedicationType => {
            parse_medication_type(text).map(FieldValue::MedicationType)
        }
        OnboardingStep::MedicineNames => Some(FieldValue::Medicines(parse_medicines(text))),
        OnboardingStep::Diet => parse_diet(text).map(FieldValue::Diet),
        OnboardingStep::Comorbidities => Some(FieldValue::Comorbidities(parse_comorbidities(text))),
        OnboardingStep::HbA1c => parse_hba1c(text).map(FieldValue::HbA1c),
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Lowercase, map Devanagari digits to ASCII and curly apostrophes to `'`.
fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '०'..='९' => char::from_digit(c as u32 - '०' as u32, 10).unwrap_or(c),
            '\u{2018}' | '\u{2019}' => '\'',
            _ => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// ASCII words; apostrophes inside a word are kept, so "i'm" stays whole.
fn ascii_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
}

/// A negation only applies within its own clause.
fn clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', ';', '.', '!', '?', '।', '\n'])
}

const NEGATIONS: &[&str] = &["no", "not", "dont", "don't", "never", "without", "nor"];
/// Hinglish negations that follow the word they negate.
const TRAILING_NEGATIONS: &[&str] = &["nahi", "nahin"];
/// Matched as word prefixes, before or after the keyword.
const DEVANAGARI_NEGATIONS: &[&str] = &["नहीं", "नही", "नाही", "बिना"];

fn is_negation(word: &str) -> bool {
    let word = word.trim_matches(|c: char| c.is_ascii_punctuation());
    NEGATIONS.contains(&word)
        || TRAILING_NEGATIONS.contains(&word)
        || DEVANAGARI_NEGATIONS.iter().any(|n| word.starts_with(n))
}

/// Keywords like "no" or "koi nahi" are never treated as negated.
fn is_negative_keyword(keyword: &str) -> bool {
    keyword.split_whitespace().any(is_negation)
        || DEVANAGARI_NEGATIONS.iter().any(|n| keyword.contains(n))
}

/// Whether `keyword` occurs in `lower`, split by whether a negation is
/// attached to it: `(affirmed, negated)`.
///
/// An ASCII keyword is negated by one of the two words before it or by a
/// trailing "nahi". A Devanagari keyword is negated by the word right
/// before or after it.
fn keyword_hits(lower: &str, keyword: &str) -> (bool, bool) {
    let check = !is_negative_keyword(keyword);
    let phrase: Vec<&str> = ascii_words(keyword).collect();
    if keyword.is_ascii() && phrase.is_empty() {
        return (false, false);
    }
    let mut affirmed = false;
    let mut negated = false;
    for clause in clauses(lower) {
        if keyword.is_ascii() {
            let words: Vec<&str> = ascii_words(clause).collect();
            for (i, window) in words.windows(phrase.len()).enumerate() {
                if window != phrase.as_slice() {
                    continue;
                }
                let before = words[i.saturating_sub(2)..i].iter().any(|w| NEGATIONS.contains(w));
                let after = words
                    .get(i + phrase.len())
                    .is_some_and(|w| TRAILING_NEGATIONS.contains(w));
                if check && (before || after) {
                    negated = true;
                } else {
                    affirmed = true;
                }
            }
        } else {
            for (pos, _) in clause.match_indices(keyword) {
                let before = clause[..pos]
                    .trim_end_matches(|c: char| !c.is_whitespace())
                    .split_whitespace()
                    .next_back();
                let after = clause[pos + keyword.len()..]
                    .trim_start_matches(|c: char| !c.is_whitespace())
                    .split_whitespace()
                    .next();
                if check && (before.is_some_and(is_negation) || after.is_some_and(is_negation)) {
                    negated = true;
                } else {
                    affirmed = true;
                }
            }
        }
    }
    (affirmed, negated)
}

/// `lower` must already be normalized. Negated mentions do not count.
fn has_keyword(lower: &str, keyword: &str) -> bool {
    keyword_hits(lower, keyword).0
}

fn has_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| has_keyword(lower, kw))
}

/// `keyword_hits` folded over a keyword list.
fn any_hits(lower: &str, keywords: &[&str]) -> (bool, bool) {
    keywords
        .iter()
        .map(|kw| keyword_hits(lower, kw))
        .fold((false, false), |(a, n), (ka, kn)| (a || ka, n || kn))
}

static MENU_CHOICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?([1-9])\s*[.)]?$").unwrap());

/// A bare numbered menu choice like `2`, `2.` or `(2)`.
fn menu_choice(lower: &str) -> Option<usize> {
    MENU_CHOICE
        .captures(lower)
        .and_then(|c| c[1].parse::<usize>().ok())
}

/// Menu choice (1-based into `menu`) or first keyword hit in table order.
fn match_choice<T: Copy>(lower: &str, menu: &[T], keywords: &[(T, &[&str])]) -> Option<T> {
    if let Some(n) = menu_choice(lower) {
        return menu.get(n - 1).copied();
    }
    keywords
        .iter()
        .find(|(_, kws)| has_any(lower, kws))
        .map(|(value, _)| *value)
}

/// Canonical names whose keywords occur in `lower`, in order of first appearance.
fn collect_matches(lower: &str, catalog: &[(&str, &[&str])]) -> Vec<String> {
    let mut hits: Vec<(usize, &str)> = catalog
        .iter()
        .filter_map(|(name, kws)| {
            kws.iter()
                .filter(|kw| has_keyword(lower, kw))
                .filter_map(|kw| lower.find(*kw))
                .min()
                .map(|pos| (pos, *name))
        })
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);
    let names: Vec<String> = hits.into_iter().map(|(_, n)| n.to_string()).collect();
    if names.is_empty() {
        vec![NONE_SENTINEL.to_string()]
    } else {
        names
    }
}

// ── Language ────────────────────────────────────────────────────────

const LANGUAGE_MENU: [Language; 3] = [Language::English, Language::Hindi, Language::Marathi];

const LANGUAGE_KEYWORDS: &[(Language, &[&str])] = &[
    (
        Language::English,
        &["english", "eng", "angrezi", "अंग्रेजी", "अंग्रेज़ी", "इंग्लिश", "इंग्रजी"],
    ),
    (Language::Hindi, &["hindi", "हिंदी", "हिन्दी"]),
    (Language::Marathi, &["marathi", "मराठी"]),
];

pub fn parse_language(text: &str) -> Option<Language> {
    match_choice(&normalize(text), &LANGUAGE_MENU, LANGUAGE_KEYWORDS)
}

// ── Name ────────────────────────────────────────────────────────────

static NAME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(my name is|my name's|name is|i am|i'm|this is|मेरा नाम|माझे नाव|माझं नाव)\s*[:\-]?\s*")
        .unwrap()
});

static NAME_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(है|हैं|आहे)[.!।]*$").unwrap());

const NAME_MAX_CHARS: usize = 60;

pub fn parse_name(text: &str) -> Option<String> {
    let stripped = NAME_PREFIX.replace(text.trim(), "");
    let stripped = NAME_SUFFIX.replace(&stripped, "");
    let name = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let len = name.chars().count();
    if !(2..=NAME_MAX_CHARS).contains(&len) {
        return None;
    }
    if name.chars().any(|c| c.is_ascii_digit() || ('०'..='९').contains(&c)) {
        return None;
    }
    if !name.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(name)
}

// ── Age ─────────────────────────────────────────────────────────────

static NUMBER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

pub fn parse_age(text: &str) -> Option<u8> {
    let lower = normalize(text);
    let digits = NUMBER_RUN.find(&lower)?.as_str();
    if digits.len() > 3 {
        return None;
    }
    let age: u16 = digits.parse().ok()?;
    if (1..=120).contains(&age) {
        u8::try_from(age).ok()
    } else {
        None
    }
}

// ── Gender ──────────────────────────────────────────────────────────

const GENDER_MENU: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

const GENDER_KEYWORDS: &[(Gender, &[&str])] = &[
    (
        Gender::Female,
        &["female", "f", "woman", "lady", "girl", "mahila", "महिला", "स्त्री", "औरत"],
    ),
    (
        Gender::Male,
        &["male", "m", "man", "boy", "purush", "पुरुष", "पुरूष", "मर्द"],
    ),
    (Gender::Other, &["other", "others", "transgender", "अन्य", "इतर"]),
];

pub fn parse_gender(text: &str) -> Option<Gender> {
    match_choice(&normalize(text), &GENDER_MENU, GENDER_KEYWORDS)
}

// ── Phone ───────────────────────────────────────────────────────────

static INDIAN_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+?91|0)?([6-9][0-9]{9})$").unwrap());

/// Indian mobile number in canonical `+91XXXXXXXXXX` form.
pub fn parse_phone(text: &str) -> Option<String> {
    let compact: String = normalize(text)
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    INDIAN_MOBILE
        .captures(&compact)
        .map(|c| format!("+91{}", &c[1]))
}

const SKIP_KEYWORDS: &[&str] = &[
    "skip", "no", "none", "na", "nahi", "later", "छोड़ें", "छोड़ो", "नहीं", "वगळा", "नको",
];

/// Whether the user declined an optional question.
pub fn is_skip(text: &str) -> bool {
    has_any(&normalize(text), SKIP_KEYWORDS)
}

// ── Pincode ─────────────────────────────────────────────────────────

static PINCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([0-9]{6})\b").unwrap());

/// First standalone 6-digit group anywhere in the text.
pub fn parse_pincode(text: &str) -> Option<String> {
    PINCODE
        .captures(&normalize(text))
        .map(|c| c[1].to_string())
}

// ── Consent ─────────────────────────────────────────────────────────

const YES_KEYWORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "ok", "okay", "agree", "i agree", "sure", "haan", "han", "ha",
    "हाँ", "हां", "हा", "होय", "ठीक", "सहमत",
];

const NO_KEYWORDS: &[&str] = &[
    "no", "n", "nope", "disagree", "nahi", "nahin", "नहीं", "नही", "नाही", "नको", "असहमत",
];

/// `None` when the answer is neither or both.
pub fn parse_consent(text: &str) -> Option<bool> {
    let lower = normalize(text);
    match menu_choice(&lower) {
        Some(1) => return Some(true),
        Some(2) => return Some(false),
        Some(_) => return None,
        None => {}
    }
    // "असहमत" contains "सहमत"
    let disagreed = lower.contains("असहमत");
    let (yes, negated_yes) = any_hits(&lower, YES_KEYWORDS);
    let yes = yes && !disagreed;
    // "don't agree" is a refusal
    let no = has_any(&lower, NO_KEYWORDS) || (negated_yes && !yes);
    match (yes, no) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

// ── Diabetes type ───────────────────────────────────────────────────

const DIABETES_MENU: [DiabetesType; 4] = [
    DiabetesType::Type1,
    DiabetesType::Type2,
    DiabetesType::Gestational,
    DiabetesType::Prediabetes,
];

/// Matched against the text with spaces, hyphens and underscores removed.
const DIABETES_KEYWORDS: &[(DiabetesType, &[&str])] = &[
    (
        DiabetesType::Gestational,
        &["gestational", "gdm", "pregnancy", "गर्भावस्था", "गर्भधारणा"],
    ),
    (
        DiabetesType::Prediabetes,
        &["prediabet", "borderline", "प्रीडायबिटीज", "प्री-डायबिटीज"],
    ),
    (
        DiabetesType::Type1,
        &["type1", "typeone", "typei", "t1dm", "टाइप1", "टाईप1"],
    ),
    (
        DiabetesType::Type2,
        &["type2", "typetwo", "typeii", "t2dm", "टाइप2", "टाईप2"],
    ),
];

pub fn parse_diabetes_type(text: &str) -> Option<DiabetesType> {
    let lower = normalize(text);
    if let Some(n) = menu_choice(&lower) {
        return DIABETES_MENU.get(n - 1).copied();
    }
    let compact: String = lower
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect();
    // "typeii" before "typei"
    if compact.contains("typeii") || compact.contains("type2") {
        return Some(DiabetesType::Type2);
    }
    DIABETES_KEYWORDS
        .iter()
        .find(|(_, kws)| kws.iter().any(|kw| compact.contains(*kw)))
        .map(|(value, _)| *value)
}

// ── Duration ────────────────────────────────────────────────────────

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<value>[0-9]+(?:\.[0-9]+)?)\s*(?:",
        r"(?P<months>(?:months?|mon|mos?|mahine|mahina|महीने|महीना|महिने|महिना)\b)",
        r"|(?P<years>(?:years?|yrs?|saal|sal|साल|वर्ष)\b)",
        r")?",
    ))
    .unwrap()
});

const NEWLY_DIAGNOSED: &[&str] = &[
    "new", "newly", "just diagnosed", "recently", "this year", "नया", "अभी", "नवीन", "नुकताच",
];

const MAX_DURATION_YEARS: Decimal = dec!(80);

/// Years since diagnosis; months are converted to years.
///
/// Every number with a unit is summed ("1 year 6 months" is 1.5). With no
/// unit anywhere, the first number is read as years.
pub fn parse_duration_years(text: &str) -> Option<Decimal> {
    let lower = normalize(text);
    let mut total = Decimal::ZERO;
    let mut has_unit = false;
    let mut first_bare = None;
    for caps in DURATION.captures_iter(&lower) {
        let value = Decimal::from_str(&caps["value"]).ok()?;
        if caps.name("months").is_some() {
            total += value / dec!(12);
            has_unit = true;
        } else if caps.name("years").is_some() {
            total += value;
            has_unit = true;
        } else if first_bare.is_none() {
            first_bare = Some(value);
        }
    }
    let years = match (has_unit, first_bare) {
        (true, _) => total,
        (false, Some(value)) => value,
        (false, None) => return has_any(&lower, NEWLY_DIAGNOSED).then_some(Decimal::ZERO),
    };
    let years = years.round_dp(2).normalize();
    (years <= MAX_DURATION_YEARS).then_some(years)
}

// ── Medication type ─────────────────────────────────────────────────

const MEDICATION_MENU: [MedicationType; 4] = [
    MedicationType::Tablets,
    MedicationType::Insulin,
    MedicationType::Both,
    MedicationType::None,
];

const BOTH_KEYWORDS: &[&str] = &["both", "dono", "दोनों", "दोन्ही"];
const INSULIN_KEYWORDS: &[&str] = &["insulin", "injection", "इंसुलिन", "इन्सुलिन", "इंजेक्शन"];
const TABLET_KEYWORDS: &[&str] = &[
    "tablet", "tablets", "pill", "pills", "oral", "goli", "गोली", "गोलियां", "गोळी", "गोळ्या",
];
const NO_MEDICATION_KEYWORDS: &[&str] = &[
    "none", "no", "nothing", "nil", "diet only", "koi nahi", "कोई नहीं", "नहीं", "काही नाही", "नाही",
];

/// A negated type does not count, and a reply that only negates types
/// ("I don't take tablets") means no medication.
pub fn parse_medication_type(text: &str) -> Option<MedicationType> {
    let lower = normalize(text);
    if let Some(n) = menu_choice(&lower) {
        return MEDICATION_MENU.get(n - 1).copied();
    }
    if has_any(&lower, BOTH_KEYWORDS) {
        return Some(MedicationType::Both);
    }
    let (insulin, insulin_negated) = any_hits(&lower, INSULIN_KEYWORDS);
    let (tablets, tablets_negated) = any_hits(&lower, TABLET_KEYWORDS);
    match (insulin, tablets) {
        (true, true) => Some(MedicationType::Both),
        (true, false) => Some(MedicationType::Insulin),
        (false, true) => Some(MedicationType::Tablets),
        (false, false) => (insulin_negated
            || tablets_negated
            || has_any(&lower, NO_MEDICATION_KEYWORDS))
        .then_some(MedicationType::None),
    }
}

// ── Medicine names ──────────────────────────────────────────────────

const MEDICINE_CATALOG: &[(&str, &[&str])] = &[
    ("Metformin", &["metformin", "glycomet", "glucophage", "मेटफॉर्मिन"]),
    ("Glimepiride", &["glimepiride", "amaryl", "ग्लिमेपिराइड"]),
    ("Gliclazide", &["gliclazide", "diamicron"]),
    ("Glibenclamide", &["glibenclamide", "daonil"]),
    ("Sitagliptin", &["sitagliptin", "januvia", "istavel"]),
    ("Vildagliptin", &["vildagliptin", "galvus"]),
    ("Teneligliptin", &["teneligliptin"]),
    ("Dapagliflozin", &["dapagliflozin", "forxiga"]),
    ("Empagliflozin", &["empagliflozin", "jardiance"]),
    ("Pioglitazone", &["pioglitazone"]),
    ("Voglibose", &["voglibose"]),
    ("Insulin glargine", &["glargine", "lantus", "basalog"]),
    ("Insulin aspart", &["aspart", "novorapid"]),
    ("Human insulin", &["mixtard", "actrapid", "human insulin"]),
    ("Insulin", &["insulin", "इंसुलिन", "इन्सुलिन"]),
];

/// Medicine names found in free text, or `["None"]`.
///
/// Brand names map to their generic. Bare "insulin" is dropped when a
/// specific insulin is also named.
pub fn parse_medicines(text: &str) -> Vec<String> {
    let lower = normalize(text);
    // Substring match so "metformin500" or "glycomet-gp" still hit.
    let mut found: Vec<(usize, &str)> = MEDICINE_CATALOG
        .iter()
        .filter_map(|(name, kws)| {
            kws.iter()
                .filter_map(|kw| lower.find(*kw))
                .min()
                .map(|pos| (pos, *name))
        })
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let specific_insulin = found
        .iter()
        .any(|(_, n)| *n != "Insulin" && n.to_lowercase().contains("insulin"));
    let names: Vec<String> = found
        .into_iter()
        .filter(|(_, n)| !(specific_insulin && *n == "Insulin"))
        .map(|(_, n)| n.to_string())
        .collect();

    if names.is_empty() {
        vec![NONE_SENTINEL.to_string()]
    } else {
        names
    }
}

// ── Diet ────────────────────────────────────────────────────────────

const DIET_MENU: [DietPreference; 3] = [
    DietPreference::Vegetarian,
    DietPreference::NonVegetarian,
    DietPreference::Eggetarian,
];

const NON_VEG_KEYWORDS: &[&str] = &[
    "nonveg", "non veg", "nonvegetarian", "non vegetarian", "mansahari", "meat", "chicken",
    "fish", "mutton", "मांसाहारी", "माँसाहारी",
];
const EGG_KEYWORDS: &[&str] = &[
    "egg", "eggs", "eggetarian", "eggitarian", "anda", "अंडा", "अंडे", "अंडी",
];
const VEG_KEYWORDS: &[&str] = &["veg", "vegetarian", "vegan", "veggie", "shakahari", "शाकाहारी"];

/// Checked non-veg, then egg, then veg, so "non veg" is not read as "veg".
pub fn parse_diet(text: &str) -> Option<DietPreference> {
    let lower = normalize(text);
    if let Some(n) = menu_choice(&lower) {
        return DIET_MENU.get(n - 1).copied();
    }
    if has_any(&lower, NON_VEG_KEYWORDS) {
        Some(DietPreference::NonVegetarian)
    } else if has_any(&lower, EGG_KEYWORDS) {
        Some(DietPreference::Eggetarian)
    } else if has_any(&lower, VEG_KEYWORDS) {
        Some(DietPreference::Vegetarian)
    } else {
        None
    }
}

// ── Comorbidities ───────────────────────────────────────────────────

const COMORBIDITY_CATALOG: &[(&str, &[&str])] = &[
    (
        "Hypertension",
        &[
            "hypertension", "bp", "blood pressure", "बीपी", "रक्तचाप", "ब्लड प्रेशर", "रक्तदाब",
        ],
    ),
    ("Heart disease", &["heart", "cardiac", "हृदय", "दिल", "हार्ट"]),
    ("Kidney disease", &["kidney", "renal", "ckd", "किडनी", "गुर्दे", "मूत्रपिंड"]),
    ("Thyroid", &["thyroid", "hypothyroid", "hypothyroidism", "थायराइड", "थायरॉईड"]),
    ("High cholesterol", &["cholesterol", "lipid", "lipids", "कोलेस्ट्रॉल"]),
    ("Obesity", &["obesity", "obese", "overweight", "मोटापा", "लठ्ठपणा"]),
    ("Eye problems", &["retinopathy", "eye", "eyes", "vision", "आंख", "आँख", "डोळे"]),
    ("Neuropathy", &["neuropathy", "numbness", "tingling", "झुनझुनी", "सुन्न"]),
];

/// Other conditions found in free text, or `["None"]`.
pub fn parse_comorbidities(text: &str) -> Vec<String> {
    collect_matches(&normalize(text), COMORBIDITY_CATALOG)
}

// ── HbA1c ───────────────────────────────────────────────────────────

/// A number, with the time unit that follows it if any.
static HBA1C_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<value>[0-9]+(?:\.[0-9]+)?)\s*",
        r"(?P<unit>(?:months?|mons?|mos?|years?|yrs?|weeks?|days?|saal|mahine|mahina",
        r"|महीने|महीना|महिने|महिना|साल|वर्ष|हफ्ते|दिन)\b)?",
    ))
    .unwrap()
});

const HBA1C_MIN: Decimal = dec!(3.0);
const HBA1C_MAX: Decimal = dec!(20.0);

const UNKNOWN_KEYWORDS: &[&str] = &[
    "don't know", "dont know", "do not know", "not known", "unknown", "not sure", "no idea",
    "never tested", "never checked", "idk", "पता नहीं", "मालूम नहीं", "नहीं पता", "माहित नाही",
    "माहीत नाही",
];

/// First in-range number that is not a time span ("3 months ago it was
/// 7.8" reads 7.8).
pub fn parse_hba1c(text: &str) -> Option<HbA1cReading> {
    let lower = normalize(text).replace("hba1c", " ").replace("a1c", " ");
    let reading = HBA1C_NUMBER
        .captures_iter(&lower)
        .filter(|caps| caps.name("unit").is_none())
        .filter_map(|caps| Decimal::from_str(&caps["value"]).ok())
        .find(|value| (HBA1C_MIN..=HBA1C_MAX).contains(value));
    if let Some(value) = reading {
        return Some(HbA1cReading::Percent(value));
    }
    has_any(&lower, UNKNOWN_KEYWORDS).then_some(HbA1cReading::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_menu_and_keywords() {
        assert_eq!(parse_language("1"), Some(Language::English));
        assert_eq!(parse_language("2"), Some(Language::Hindi));
        assert_eq!(parse_language(" 3. "), Some(Language::Marathi));
        assert_eq!(parse_language("२"), Some(Language::Hindi));
        assert_eq!(parse_language("HINDI please"), Some(Language::Hindi));
        assert_eq!(parse_language("हिंदी"), Some(Language::Hindi));
        assert_eq!(parse_language("मराठी"), Some(Language::Marathi));
        assert_eq!(parse_language("4"), None);
        assert_eq!(parse_language("hi"), None);
        assert_eq!(parse_language(""), None);
    }

    #[test]
    fn name_accepts_plain_and_prefixed() {
        assert_eq!(parse_name("Ramesh Kumar").as_deref(), Some("Ramesh Kumar"));
        assert_eq!(parse_name("my name is  Asha   Patil").as_deref(), Some("Asha Patil"));
        assert_eq!(parse_name("मेरा नाम रमेश है").as_deref(), Some("रमेश"));
        assert_eq!(parse_name("सुनीता").as_deref(), Some("सुनीता"));
    }

    #[test]
    fn name_rejects_garbage() {
        assert_eq!(parse_name(""), None);
        assert_eq!(parse_name("a"), None);
        assert_eq!(parse_name("12345"), None);
        assert_eq!(parse_name("Ram 2"), None);
        assert_eq!(parse_name("!!!"), None);
        assert_eq!(parse_name(&"x".repeat(61)), None);
    }

    #[test]
    fn age_range() {
        assert_eq!(parse_age("55"), Some(55));
        assert_eq!(parse_age("I am 62 years old"), Some(62));
        assert_eq!(parse_age("1"), Some(1));
        assert_eq!(parse_age("120"), Some(120));
        assert_eq!(parse_age("५५"), Some(55));
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_age("121"), None);
        assert_eq!(parse_age("200"), None);
        assert_eq!(parse_age("1000"), None);
        assert_eq!(parse_age("fifty"), None);
        assert_eq!(parse_age("৫৫"), None);
    }

    #[test]
    fn gender_female_not_confused_with_male() {
        assert_eq!(parse_gender("female"), Some(Gender::Female));
        assert_eq!(parse_gender("Male"), Some(Gender::Male));
        assert_eq!(parse_gender("F"), Some(Gender::Female));
        assert_eq!(parse_gender("2"), Some(Gender::Female));
        assert_eq!(parse_gender("महिला"), Some(Gender::Female));
        assert_eq!(parse_gender("पुरुष"), Some(Gender::Male));
        assert_eq!(parse_gender("3"), Some(Gender::Other));
        assert_eq!(parse_gender("maybe"), None);
        // "I'm" is one word, not "i" + "m"
        assert_eq!(parse_gender("I'm transgender"), Some(Gender::Other));
        assert_eq!(parse_gender("I'm other"), Some(Gender::Other));
        assert_eq!(parse_gender("I\u{2019}m female"), Some(Gender::Female));
        assert_eq!(parse_gender("I'm a man"), Some(Gender::Male));
        assert_eq!(parse_gender("M"), Some(Gender::Male));
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(parse_phone("9876543210").as_deref(), Some("+919876543210"));
        assert_eq!(parse_phone("98765 43210").as_deref(), Some("+919876543210"));
        assert_eq!(parse_phone("+91-98765-43210").as_deref(), Some("+919876543210"));
        assert_eq!(parse_phone("919876543210").as_deref(), Some("+919876543210"));
        assert_eq!(parse_phone("09876543210").as_deref(), Some("+919876543210"));
        assert_eq!(parse_phone("9123456789").as_deref(), Some("+919123456789"));
    }

    #[test]
    fn phone_rejects_invalid() {
        assert_eq!(parse_phone("5876543210"), None);
        assert_eq!(parse_phone("987654321"), None);
        assert_eq!(parse_phone("98765432100"), None);
        assert_eq!(parse_phone("call my son"), None);
        assert_eq!(parse_phone("৯৮৭৬৫৪৩২১০"), None);
    }

    #[test]
    fn emergency_skip_is_optional() {
        let allow = ParserOptions::default();
        let deny = ParserOptions {
            allow_emergency_skip: false,
        };
        assert_eq!(
            parse_field(OnboardingStep::EmergencyContact, "skip", &allow),
            Some(FieldValue::EmergencyContact(EmergencyContact::Skipped))
        );
        assert_eq!(
            parse_field(OnboardingStep::EmergencyContact, "skip", &deny),
            None
        );
        assert_eq!(
            parse_field(OnboardingStep::EmergencyContact, "9876543210", &deny),
            Some(FieldValue::EmergencyContact(EmergencyContact::Number(
                "+919876543210".to_string()
            )))
        );
    }

    #[test]
    fn pincode_anywhere_in_text() {
        assert_eq!(parse_pincode("411001").as_deref(), Some("411001"));
        assert_eq!(parse_pincode("my pin is 110011, Delhi").as_deref(), Some("110011"));
        assert_eq!(parse_pincode("4110011"), None);
        assert_eq!(parse_pincode("41100"), None);
        assert_eq!(parse_pincode("9876543210"), None);
    }

    #[test]
    fn only_ascii_and_devanagari_digits_are_numbers() {
        assert_eq!(parse_pincode("৪১১০০১"), None);
        assert_eq!(parse_pincode("４１１００１"), None);
        assert_eq!(parse_pincode("४११००१").as_deref(), Some("411001"));
        assert_eq!(parse_hba1c("৭.২"), None);
    }

    #[test]
    fn consent_yes_no_and_ambiguity() {
        assert_eq!(parse_consent("yes"), Some(true));
        assert_eq!(parse_consent("Yes, I agree"), Some(true));
        assert_eq!(parse_consent("1"), Some(true));
        assert_eq!(parse_consent("हाँ"), Some(true));
        assert_eq!(parse_consent("होय"), Some(true));
        assert_eq!(parse_consent("no"), Some(false));
        assert_eq!(parse_consent("2"), Some(false));
        assert_eq!(parse_consent("नहीं"), Some(false));
        assert_eq!(parse_consent("नाही"), Some(false));
        assert_eq!(parse_consent("असहमत"), Some(false));
        assert_eq!(parse_consent("disagree"), Some(false));
        assert_eq!(parse_consent("yes no"), None);
        assert_eq!(parse_consent("what?"), None);
        assert_eq!(parse_consent("I don't agree"), Some(false));
        assert_eq!(parse_consent("not ok"), Some(false));
    }

    #[test]
    fn diabetes_type_variants() {
        assert_eq!(parse_diabetes_type("2"), Some(DiabetesType::Type2));
        assert_eq!(parse_diabetes_type("Type 2"), Some(DiabetesType::Type2));
        assert_eq!(parse_diabetes_type("type-1"), Some(DiabetesType::Type1));
        assert_eq!(parse_diabetes_type("Type II"), Some(DiabetesType::Type2));
        assert_eq!(parse_diabetes_type("T1DM"), Some(DiabetesType::Type1));
        assert_eq!(parse_diabetes_type("टाइप 2"), Some(DiabetesType::Type2));
        assert_eq!(
            parse_diabetes_type("during pregnancy"),
            Some(DiabetesType::Gestational)
        );
        assert_eq!(
            parse_diabetes_type("pre-diabetes"),
            Some(DiabetesType::Prediabetes)
        );
        assert_eq!(parse_diabetes_type("5"), None);
        assert_eq!(parse_diabetes_type("sugar"), None);
    }

    #[test]
    fn duration_years_and_months() {
        assert_eq!(parse_duration_years("5"), Some(dec!(5)));
        assert_eq!(parse_duration_years("10 years"), Some(dec!(10)));
        assert_eq!(parse_duration_years("2.5"), Some(dec!(2.5)));
        assert_eq!(parse_duration_years("6 months"), Some(dec!(0.5)));
        assert_eq!(parse_duration_years("3 महीने"), Some(dec!(0.25)));
        assert_eq!(parse_duration_years("just diagnosed"), Some(Decimal::ZERO));
        assert_eq!(parse_duration_years("नया है"), Some(Decimal::ZERO));
        assert_eq!(parse_duration_years("81"), None);
        assert_eq!(parse_duration_years("long time"), None);
    }

    #[test]
    fn duration_sums_years_and_months() {
        assert_eq!(parse_duration_years("1 year 6 months"), Some(dec!(1.5)));
        assert_eq!(parse_duration_years("2 years and 3 months"), Some(dec!(2.25)));
        assert_eq!(parse_duration_years("5 साल 6 महीने"), Some(dec!(5.5)));
        assert_eq!(parse_duration_years("18 months"), Some(dec!(1.5)));
        assert_eq!(parse_duration_years("80 years 6 months"), None);
    }

    #[test]
    fn medication_type_variants() {
        assert_eq!(parse_medication_type("1"), Some(MedicationType::Tablets));
        assert_eq!(parse_medication_type("4"), Some(MedicationType::None));
        assert_eq!(parse_medication_type("tablets"), Some(MedicationType::Tablets));
        assert_eq!(parse_medication_type("Insulin"), Some(MedicationType::Insulin));
        assert_eq!(
            parse_medication_type("tablets and insulin"),
            Some(MedicationType::Both)
        );
        assert_eq!(parse_medication_type("दोनों"), Some(MedicationType::Both));
        assert_eq!(parse_medication_type("none"), Some(MedicationType::None));
        assert_eq!(parse_medication_type("कोई नहीं"), Some(MedicationType::None));
        assert_eq!(parse_medication_type("homeopathy"), None);
    }

    #[test]
    fn medication_type_ignores_negated_types() {
        assert_eq!(
            parse_medication_type("no tablets, nothing"),
            Some(MedicationType::None)
        );
        assert_eq!(
            parse_medication_type("I don't take tablets"),
            Some(MedicationType::None)
        );
        assert_eq!(
            parse_medication_type("no tablets, only insulin"),
            Some(MedicationType::Insulin)
        );
        assert_eq!(
            parse_medication_type("not both, just tablets"),
            Some(MedicationType::Tablets)
        );
        assert_eq!(parse_medication_type("गोली नहीं"), Some(MedicationType::None));
        assert_eq!(parse_medication_type("insulin nahi"), Some(MedicationType::None));
    }

    #[test]
    fn medicines_extracts_known_names_in_order() {
        assert_eq!(
            parse_medicines("Glycomet 500 and januvia"),
            vec!["Metformin".to_string(), "Sitagliptin".to_string()]
        );
        assert_eq!(
            parse_medicines("lantus insulin, metformin"),
            vec!["Insulin glargine".to_string(), "Metformin".to_string()]
        );
        assert_eq!(parse_medicines("insulin"), vec!["Insulin".to_string()]);
        assert_eq!(
            parse_medicines("metformin metformin"),
            vec!["Metformin".to_string()]
        );
    }

    #[test]
    fn free_text_lists_never_reject() {
        for text in ["", "asdf qwer", "!!!", "12345", "मुझे नहीं पता"] {
            assert_eq!(parse_medicines(text), vec![NONE_SENTINEL.to_string()]);
            assert_eq!(parse_comorbidities(text), vec![NONE_SENTINEL.to_string()]);
            for step in [OnboardingStep::MedicineNames, OnboardingStep::Comorbidities] {
                assert!(parse_field(step, text, &ParserOptions::default()).is_some());
            }
        }
    }

    #[test]
    fn comorbidities_keywords() {
        assert_eq!(
            parse_comorbidities("high BP and thyroid"),
            vec!["Hypertension".to_string(), "Thyroid".to_string()]
        );
        assert_eq!(
            parse_comorbidities("किडनी की समस्या, बीपी"),
            vec!["Kidney disease".to_string(), "Hypertension".to_string()]
        );
        // "bp" only as a whole word
        assert_eq!(parse_comorbidities("bpl card"), vec![NONE_SENTINEL.to_string()]);
    }

    #[test]
    fn diet_variants() {
        assert_eq!(parse_diet("1"), Some(DietPreference::Vegetarian));
        assert_eq!(parse_diet("veg"), Some(DietPreference::Vegetarian));
        assert_eq!(parse_diet("Non-Veg"), Some(DietPreference::NonVegetarian));
        assert_eq!(parse_diet("non vegetarian"), Some(DietPreference::NonVegetarian));
        assert_eq!(parse_diet("I eat eggs"), Some(DietPreference::Eggetarian));
        assert_eq!(parse_diet("शाकाहारी"), Some(DietPreference::Vegetarian));
        assert_eq!(parse_diet("मांसाहारी"), Some(DietPreference::NonVegetarian));
        assert_eq!(parse_diet("anything"), None);
        assert_eq!(parse_diet("eggetarian"), Some(DietPreference::Eggetarian));
    }

    #[test]
    fn diet_ignores_negated_choices() {
        assert_eq!(parse_diet("pure veg, no egg"), Some(DietPreference::Vegetarian));
        assert_eq!(parse_diet("veg, not non veg"), Some(DietPreference::Vegetarian));
        assert_eq!(parse_diet("no meat but eggs"), Some(DietPreference::Eggetarian));
        assert_eq!(
            parse_diet("शाकाहारी, अंडा नहीं"),
            Some(DietPreference::Vegetarian)
        );
        assert_eq!(parse_diet("अंडी नाही"), None);
    }

    #[test]
    fn hba1c_values_and_unknown() {
        assert_eq!(parse_hba1c("7.2"), Some(HbA1cReading::Percent(dec!(7.2))));
        assert_eq!(parse_hba1c("HbA1c 8.1%"), Some(HbA1cReading::Percent(dec!(8.1))));
        assert_eq!(parse_hba1c("3"), Some(HbA1cReading::Percent(dec!(3))));
        assert_eq!(parse_hba1c("20.0"), Some(HbA1cReading::Percent(dec!(20.0))));
        assert_eq!(parse_hba1c("I don't know"), Some(HbA1cReading::Unknown));
        assert_eq!(parse_hba1c("पता नहीं"), Some(HbA1cReading::Unknown));
        assert_eq!(parse_hba1c("माहित नाही"), Some(HbA1cReading::Unknown));
        assert_eq!(parse_hba1c("2.9"), None);
        assert_eq!(parse_hba1c("25"), None);
        assert_eq!(parse_hba1c("high"), None);
    }

    #[test]
    fn hba1c_skips_time_spans() {
        assert_eq!(
            parse_hba1c("3 months ago it was 7.8"),
            Some(HbA1cReading::Percent(dec!(7.8)))
        );
        assert_eq!(
            parse_hba1c("7.1 checked 6 months back"),
            Some(HbA1cReading::Percent(dec!(7.1)))
        );
        assert_eq!(
            parse_hba1c("2 महीने पहले 8.4 था"),
            Some(HbA1cReading::Percent(dec!(8.4)))
        );
        assert_eq!(
            parse_hba1c("7.5 more or less"),
            Some(HbA1cReading::Percent(dec!(7.5)))
        );
        assert_eq!(parse_hba1c("tested 4 years ago"), None);
    }

    #[test]
    fn parsers_are_deterministic() {
        let opts = ParserOptions::default();
        for step in OnboardingStep::ALL {
            for text in ["1", "yes", "Ramesh", "7.5", "", "नहीं"] {
                assert_eq!(
                    parse_field(step, text, &opts),
                    parse_field(step, text, &opts)
                );
            }
        }
    }
}
