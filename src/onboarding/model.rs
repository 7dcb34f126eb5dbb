//! Patient profile and onboarding field models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Languages the bot can converse in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Marathi,
}

impl Language {
    pub const ALL: [Language; 3] = [Self::English, Self::Hindi, Self::Marathi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Marathi => "marathi",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "english" | "en" => Ok(Self::English),
            "hindi" | "hi" => Ok(Self::Hindi),
            "marathi" | "mr" => Ok(Self::Marathi),
            other => Err(format!("unknown language '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiabetesType {
    Type1,
    Type2,
    Gestational,
    Prediabetes,
}

impl DiabetesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type1 => "type1",
            Self::Type2 => "type2",
            Self::Gestational => "gestational",
            Self::Prediabetes => "prediabetes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Type1 => "Type 1",
            Self::Type2 => "Type 2",
            Self::Gestational => "Gestational",
            Self::Prediabetes => "Prediabetes",
        }
    }
}

impl std::fmt::Display for DiabetesType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiabetesType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type1" => Ok(Self::Type1),
            "type2" => Ok(Self::Type2),
            "gestational" => Ok(Self::Gestational),
            "prediabetes" => Ok(Self::Prediabetes),
            other => Err(format!("unknown diabetes type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationType {
    Tablets,
    Insulin,
    Both,
    None,
}

impl MedicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tablets => "tablets",
            Self::Insulin => "insulin",
            Self::Both => "both",
            Self::None => "none",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tablets => "Tablets",
            Self::Insulin => "Insulin",
            Self::Both => "Tablets + Insulin",
            Self::None => "None",
        }
    }
}

impl std::fmt::Display for MedicationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tablets" => Ok(Self::Tablets),
            "insulin" => Ok(Self::Insulin),
            "both" => Ok(Self::Both),
            "none" => Ok(Self::None),
            other => Err(format!("unknown medication type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietPreference {
    Vegetarian,
    NonVegetarian,
    Eggetarian,
}

impl DietPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::NonVegetarian => "non_vegetarian",
            Self::Eggetarian => "eggetarian",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Vegetarian => "Vegetarian",
            Self::NonVegetarian => "Non-vegetarian",
            Self::Eggetarian => "Eggetarian",
        }
    }
}

impl std::fmt::Display for DietPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DietPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vegetarian" => Ok(Self::Vegetarian),
            "non_vegetarian" => Ok(Self::NonVegetarian),
            "eggetarian" => Ok(Self::Eggetarian),
            other => Err(format!("unknown diet '{other}'")),
        }
    }
}

/// Answer to the emergency-contact question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "number")]
pub enum EmergencyContact {
    /// Canonical `+91XXXXXXXXXX` number.
    Number(String),
    Skipped,
}

/// Answer to the HbA1c question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "percent")]
pub enum HbA1cReading {
    Percent(Decimal),
    Unknown,
}

/// Sentinel stored for list fields when nothing was recognized.
pub const NONE_SENTINEL: &str = "None";

/// One validated answer, tagged by the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Language(Language),
    Name(String),
    Age(u8),
    Gender(Gender),
    EmergencyContact(EmergencyContact),
    Pincode(String),
    Consent(bool),
    DiabetesType(DiabetesType),
    DurationYears(Decimal),
    MedicationType(MedicationType),
    Medicines(Vec<String>),
    Diet(DietPreference),
    Comorbidities(Vec<String>),
    HbA1c(HbA1cReading),
}

impl FieldValue {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Language(_) => "language",
            Self::Name(_) => "name",
            Self::Age(_) => "age",
            Self::Gender(_) => "gender",
            Self::EmergencyContact(_) => "emergency_contact",
            Self::Pincode(_) => "pincode",
            Self::Consent(_) => "consent",
            Self::DiabetesType(_) => "diabetes_type",
            Self::DurationYears(_) => "duration_years",
            Self::MedicationType(_) => "medication_type",
            Self::Medicines(_) => "medicines",
            Self::Diet(_) => "diet",
            Self::Comorbidities(_) => "comorbidities",
            Self::HbA1c(_) => "hba1c",
        }
    }
}

/// Answers accumulated by an in-progress session.
///
/// Serialized as the JSON `fields` column of `onboarding_sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diabetes_type: Option<DiabetesType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_years: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_type: Option<MedicationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet: Option<DietPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comorbidities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hba1c: Option<HbA1cReading>,
}

impl ProfileFields {
    /// Record a validated answer, replacing any earlier answer for the same field.
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Language(v) => self.language = Some(v),
            FieldValue::Name(v) => self.name = Some(v),
            FieldValue::Age(v) => self.age = Some(v),
            FieldValue::Gender(v) => self.gender = Some(v),
            FieldValue::EmergencyContact(v) => self.emergency_contact = Some(v),
            FieldValue::Pincode(v) => self.pincode = Some(v),
            FieldValue::Consent(v) => self.consent = Some(v),
            FieldValue::DiabetesType(v) => self.diabetes_type = Some(v),
            FieldValue::DurationYears(v) => self.duration_years = Some(v),
            FieldValue::MedicationType(v) => self.medication_type = Some(v),
            FieldValue::Medicines(v) => self.medicines = Some(v),
            FieldValue::Diet(v) => self.diet = Some(v),
            FieldValue::Comorbidities(v) => self.comorbidities = Some(v),
            FieldValue::HbA1c(v) => self.hba1c = Some(v),
        }
    }

    /// Build the completed profile. Errors name the first missing field.
    ///
    /// The medicine list may be absent only when medication type is `None`,
    /// in which case it becomes `["None"]`.
    pub fn finalize(&self, user_id: &str) -> Result<PatientProfile, String> {
        fn req<T: Clone>(v: &Option<T>, field: &str) -> Result<T, String> {
            v.clone().ok_or_else(|| format!("missing field '{field}'"))
        }

        let medication_type = req(&self.medication_type, "medication_type")?;
        let medicines = match (&self.medicines, medication_type) {
            (Some(list), _) => list.clone(),
            (None, MedicationType::None) => vec![NONE_SENTINEL.to_string()],
            (None, _) => return Err("missing field 'medicines'".to_string()),
        };
        let emergency_contact = match req(&self.emergency_contact, "emergency_contact")? {
            EmergencyContact::Number(n) => Some(n),
            EmergencyContact::Skipped => None,
        };
        let last_hba1c = match req(&self.hba1c, "hba1c")? {
            HbA1cReading::Percent(p) => Some(p),
            HbA1cReading::Unknown => None,
        };

        let now = Utc::now();
        Ok(PatientProfile {
            user_id: user_id.to_string(),
            language: req(&self.language, "language")?,
            name: req(&self.name, "name")?,
            age: req(&self.age, "age")?,
            gender: req(&self.gender, "gender")?,
            emergency_contact,
            pincode: req(&self.pincode, "pincode")?,
            consent: req(&self.consent, "consent")?,
            diabetes_type: req(&self.diabetes_type, "diabetes_type")?,
            duration_years: req(&self.duration_years, "duration_years")?,
            medication_type,
            medicines,
            diet: req(&self.diet, "diet")?,
            comorbidities: req(&self.comorbidities, "comorbidities")?,
            last_hba1c,
            completed: true,
            completed_at: Some(now),
            updated_at: now,
        })
    }
}

/// Finalized patient record produced when onboarding completes.
///
/// Stored as a row of `patient_profiles`, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub user_id: String,
    pub language: Language,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    pub pincode: String,
    pub consent: bool,
    pub diabetes_type: DiabetesType,
    pub duration_years: Decimal,
    pub medication_type: MedicationType,
    pub medicines: Vec<String>,
    pub diet: DietPreference,
    pub comorbidities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hba1c: Option<Decimal>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    /// Short confirmation of the collected details, in the patient's language.
    pub fn summary(&self) -> String {
        let labels = SummaryLabels::for_language(self.language);
        let mut lines = vec![
            format!("• {}: {}", labels.name, self.name),
            format!("• {}: {}", labels.age, self.age),
            format!("• {}: {}", labels.diabetes, self.diabetes_type.label()),
            format!("• {}: {}", labels.duration, self.duration_years.normalize()),
            format!("• {}: {}", labels.medication, self.medication_type.label()),
        ];
        if self.medication_type != MedicationType::None {
            lines.push(format!("• {}: {}", labels.medicines, self.medicines.join(", ")));
        }
        lines.push(format!("• {}: {}", labels.diet, self.diet.label()));
        lines.push(format!(
            "• {}: {}",
            labels.conditions,
            self.comorbidities.join(", ")
        ));
        let hba1c = match self.last_hba1c {
            Some(v) => format!("{}%", v.normalize()),
            None => labels.unknown.to_string(),
        };
        lines.push(format!("• HbA1c: {hba1c}"));
        lines.join("\n")
    }
}

struct SummaryLabels {
    name: &'static str,
    age: &'static str,
    diabetes: &'static str,
    duration: &'static str,
    medication: &'static str,
    medicines: &'static str,
    diet: &'static str,
    conditions: &'static str,
    unknown: &'static str,
}

impl SummaryLabels {
    fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self {
                name: "Name",
                age: "Age",
                diabetes: "Diabetes",
                duration: "Years since diagnosis",
                medication: "Medication",
                medicines: "Medicines",
                diet: "Diet",
                conditions: "Other conditions",
                unknown: "Not known",
            },
            Language::Hindi => Self {
                name: "नाम",
                age: "उम्र",
                diabetes: "डायबिटीज़",
                duration: "कितने साल से",
                medication: "दवा",
                medicines: "दवाइयाँ",
                diet: "आहार",
                conditions: "अन्य बीमारियाँ",
                unknown: "पता नहीं",
            },
            Language::Marathi => Self {
                name: "नाव",
                age: "वय",
                diabetes: "मधुमेह",
                duration: "किती वर्षांपासून",
                medication: "औषध",
                medicines: "औषधे",
                diet: "आहार",
                conditions: "इतर आजार",
                unknown: "माहित नाही",
            },
        }
    }
}
