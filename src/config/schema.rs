//! Configuration schema and built-in project defaults

use crate::coding::AnswerCleaner;
use crate::error::{PipelineError, PipelineResult};
use crate::transform::{ConsentRules, DerivedKey, FoldPlan, FoldPolicy, JoinCardinality};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub messages: MessagesConfig,
    pub concat: ConcatConfig,
    pub join: JoinConfig,
    pub coding: CodingConfig,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> PipelineResult<()> {
        self.messages.validate()?;
        self.coding.validate()?;
        self.analysis.validate()?;
        Ok(())
    }
}

/// Settings for the per-show `messages` stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Flag set by the messaging platform on test contacts
    pub test_run_key: String,
    /// Respondent identifier column in the CSV output
    pub phone_key: String,
    /// Inclusive start of the project run period
    pub window_start: DateTime<FixedOffset>,
    /// Inclusive end of the project run period
    pub window_end: DateTime<FixedOffset>,
    /// Offset of project local time from UTC, in minutes
    pub local_offset_minutes: i32,
    /// Name used for the local-time key, e.g. "Time EAT"
    pub local_time_label: String,
    /// Messages sampled for inter-coder reliability
    pub icr_count: usize,
    pub icr_seed: u64,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            test_run_key: "test_run".into(),
            phone_key: "avf_phone_id".into(),
            window_start: eat_midnight(2018, 10, 18),
            window_end: eat_midnight(2018, 10, 27),
            local_offset_minutes: EAT_OFFSET_MINUTES,
            local_time_label: "Time EAT".into(),
            icr_count: 200,
            icr_seed: 0,
        }
    }
}

impl MessagesConfig {
    pub fn local_offset(&self) -> PipelineResult<FixedOffset> {
        FixedOffset::east_opt(self.local_offset_minutes * 60).ok_or_else(|| {
            PipelineError::Config(format!(
                "local offset of {} minutes is out of range",
                self.local_offset_minutes
            ))
        })
    }

    fn validate(&self) -> PipelineResult<()> {
        self.local_offset()?;
        if self.window_start > self.window_end {
            return Err(PipelineError::Config(format!(
                "messages window starts ({}) after it ends ({})",
                self.window_start, self.window_end
            )));
        }
        Ok(())
    }
}

const EAT_OFFSET_MINUTES: i32 = 3 * 60;

fn eat_midnight(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(EAT_OFFSET_MINUTES * 60)
        .and_then(|tz| tz.with_ymd_and_hms(year, month, day, 0, 0, 0).single())
        .expect("built-in window dates are valid")
}

/// Normalisation applied to one named input flow by `concat-flows`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRule {
    /// Substring of keys to rewrite
    pub rename_from: String,
    /// Replacement for `rename_from`
    pub rename_to: String,
    /// Records to drop before normalising
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Exclusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatConfig {
    /// Field recording which flow a record came from
    pub source_flow_key: String,
    /// Rules keyed by input flow name
    pub flows: BTreeMap<String, FlowRule>,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        let rule = |from: &str, to: &str| FlowRule {
            rename_from: from.into(),
            rename_to: to.into(),
            exclude: None,
        };
        let reminder = |n: u32, split_flow: &str| FlowRule {
            rename_from: format!("mcf_baseline_reminder_{}", n),
            rename_to: "mcf_baseline".into(),
            exclude: Some(Exclusion {
                key: format!("Baseline_Complete_Split (Category) - {}", split_flow),
                value: Value::String("Completed".into()),
            }),
        };

        let mut flows = BTreeMap::new();
        flows.insert("radio".into(), rule("mcf_activation_radio", "mcf_activation"));
        flows.insert("offline".into(), rule("mcf_activation_offline", "mcf_activation"));
        flows.insert("baseline_reminder_1".into(), reminder(1, "mcf_baseline_reminder"));
        flows.insert("baseline_reminder_2".into(), reminder(2, "mcf_baseline_reminder_2"));

        Self {
            source_flow_key: "source_flow".into(),
            flows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub key: String,
    pub cardinality: JoinCardinality,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            key: "avf_phone_id".into(),
            cardinality: JoinCardinality::Latest,
        }
    }
}

/// One survey question sent out for manual coding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingPlan {
    /// Field holding the respondent's raw answer
    pub raw_field: String,
    /// Field the merged label is written to
    pub coded_field: String,
    /// Base name of the coding and scheme files
    pub name: String,
    /// Automatic coding of recognised answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaner: Option<AnswerCleaner>,
}

impl CodingPlan {
    pub fn new(raw_field: impl Into<String>, coded_field: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            raw_field: raw_field.into(),
            coded_field: coded_field.into(),
            name: name.into(),
            cleaner: None,
        }
    }

    pub fn with_cleaner(mut self, cleaner: AnswerCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Field holding automatic labels of the raw answer
    pub fn labels_key(&self) -> String {
        format!("{} Labels", self.raw_field)
    }

    /// Field holding the message id of the raw answer
    pub fn message_id_key(&self) -> String {
        format!("{} MessageID", self.raw_field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodingConfig {
    pub test_run_key: String,
    pub plans: Vec<CodingPlan>,
}

impl Default for CodingConfig {
    fn default() -> Self {
        let demog = |q: &str| {
            CodingPlan::new(
                format!("{} (Text) - mcf_demog", q),
                format!("{}_Coded", q),
                q,
            )
        };
        let gender = AnswerCleaner::new("Scheme-Gender")
            .with_codes("code-male", ["male", "m", "man", "boy", "mwanaume", "kiume"])
            .with_codes("code-female", ["female", "f", "woman", "girl", "mwanamke", "kike"]);
        let age = AnswerCleaner::new("Scheme-Age").with_numeric(10, 99);

        Self {
            test_run_key: "test_run".into(),
            plans: vec![
                demog("Gender").with_cleaner(gender),
                demog("Location"),
                demog("Education"),
                demog("Training"),
                demog("Work"),
                demog("Age").with_cleaner(age),
            ],
        }
    }
}

impl CodingConfig {
    fn validate(&self) -> PipelineResult<()> {
        let mut names = HashSet::new();
        for plan in &self.plans {
            if plan.name.is_empty() || plan.raw_field.is_empty() || plan.coded_field.is_empty() {
                return Err(PipelineError::Config(
                    "coding plans need a name, raw_field and coded_field".into(),
                ));
            }
            if !names.insert(plan.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "coding plan '{}' is listed twice",
                    plan.name
                )));
            }
            if let Some(cleaner) = &plan.cleaner {
                let bad_range = cleaner.numeric.map(|n| n.min > n.max).unwrap_or(false);
                if cleaner.scheme_id.is_empty() || bad_range {
                    return Err(PipelineError::Config(format!(
                        "coding plan '{}' has an invalid cleaner",
                        plan.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Respondent id the analysis dataset is folded on
    pub id_key: String,
    pub derived_keys: Vec<DerivedKey>,
    pub consent: ConsentRules,
    pub equal_keys: Vec<String>,
    pub concat_keys: Vec<String>,
    pub bool_keys: Vec<String>,
    pub matrix_keys: Vec<String>,
    /// CSV columns, in order
    pub export_keys: Vec<String>,
}

const DEMOGRAPHICS: [&str; 6] = ["location", "gender", "age", "education", "work", "training"];

impl Default for AnalysisConfig {
    fn default() -> Self {
        let consent = ConsentRules::default();

        let mut derived_keys = vec![
            DerivedKey::copy("UID", "avf_phone_id"),
            DerivedKey::copy("employment_idea_raw", "Employment_Idea (Text) - mcf_activation"),
        ];
        let mut demog_keys = Vec::new();
        for d in DEMOGRAPHICS {
            let question = capitalise(d);
            derived_keys.push(DerivedKey::label_code(d, format!("{}_Coded", question)));
            derived_keys.push(DerivedKey::copy(
                format!("{}_raw", d),
                format!("{} (Text) - mcf_demog", question),
            ));
            demog_keys.push(d.to_string());
            demog_keys.push(format!("{}_raw", d));
        }

        let mut equal_keys = vec!["UID".to_string()];
        equal_keys.extend(demog_keys.iter().cloned());

        let mut export_keys = vec![
            "UID".to_string(),
            "source_flow".to_string(),
            consent.withdrawn_key.clone(),
            "employment_idea_raw".to_string(),
        ];
        export_keys.extend(demog_keys);

        Self {
            id_key: "UID".into(),
            derived_keys,
            bool_keys: vec![consent.withdrawn_key.clone()],
            consent,
            equal_keys,
            concat_keys: vec!["employment_idea_raw".into()],
            matrix_keys: Vec::new(),
            export_keys,
        }
    }
}

impl AnalysisConfig {
    /// The fold plan described by the four key lists
    pub fn fold_plan(&self) -> FoldPlan {
        FoldPlan::new()
            .with_fields(self.equal_keys.iter().cloned(), FoldPolicy::Equal)
            .with_fields(self.concat_keys.iter().cloned(), FoldPolicy::Concat)
            .with_fields(self.bool_keys.iter().cloned(), FoldPolicy::BoolOr)
            .with_fields(self.matrix_keys.iter().cloned(), FoldPolicy::MatrixUnion)
    }

    fn validate(&self) -> PipelineResult<()> {
        let mut seen = HashSet::new();
        let lists = [&self.equal_keys, &self.concat_keys, &self.bool_keys, &self.matrix_keys];
        for key in lists.into_iter().flatten() {
            if !seen.insert(key.as_str()) {
                return Err(PipelineError::Config(format!(
                    "analysis key '{}' has more than one fold policy",
                    key
                )));
            }
        }
        Ok(())
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_window_is_in_eat() {
        let cfg = MessagesConfig::default();
        assert_eq!(cfg.window_start.to_rfc3339(), "2018-10-18T00:00:00+03:00");
        assert_eq!(cfg.local_offset().unwrap().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn default_coding_plans_match_demographic_questions() {
        let cfg = CodingConfig::default();
        assert_eq!(cfg.plans.len(), 6);
        assert_eq!(cfg.plans[0].raw_field, "Gender (Text) - mcf_demog");
        assert_eq!(cfg.plans[0].coded_field, "Gender_Coded");
        assert_eq!(cfg.plans[0].message_id_key(), "Gender (Text) - mcf_demog MessageID");
    }

    #[test]
    fn default_analysis_derives_codes_from_coded_fields() {
        let cfg = AnalysisConfig::default();
        let work = cfg.derived_keys.iter().find(|k| k.key == "work").unwrap();
        assert_eq!(work.source, "Work_Coded");
        assert!(work.label_code);
        assert_eq!(cfg.fold_plan().policy("withdrawn_consent"), Some(FoldPolicy::BoolOr));
        assert_eq!(cfg.fold_plan().policy("age_raw"), Some(FoldPolicy::Equal));
    }

    #[test]
    fn key_under_two_policies_is_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.concat_keys.push("UID".into());
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut cfg = MessagesConfig::default();
        std::mem::swap(&mut cfg.window_start, &mut cfg.window_end);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_cleaners_code_gender_and_age() {
        let cfg = CodingConfig::default();
        let cleaner = |name: &str| cfg.plans.iter().find(|p| p.name == name).unwrap().cleaner.clone();
        assert_eq!(cleaner("Gender").unwrap().clean("Mwanamke").as_deref(), Some("code-female"));
        assert_eq!(cleaner("Age").unwrap().clean("24").as_deref(), Some("code-24"));
        assert!(cleaner("Location").is_none());
        assert_eq!(cfg.plans[0].labels_key(), "Gender (Text) - mcf_demog Labels");
    }

    #[test]
    fn inverted_numeric_cleaner_is_rejected() {
        let mut cfg = CodingConfig::default();
        cfg.plans[0].cleaner = Some(AnswerCleaner::new("Scheme-Gender").with_numeric(50, 10));
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn duplicate_coding_plan_is_rejected() {
        let mut cfg = CodingConfig::default();
        cfg.plans.push(cfg.plans[0].clone());
        assert!(cfg.validate().is_err());
    }
}
