// src/rules.rs
//! ログインフォームの入力検証ルール。
//!
//! フォームライブラリに渡す形 (`{ field: [rule, ...] }`) をそのまま JSON に出せるようにし、
//! 同じルールでサーバ側・CLI 側の検証もできるようにしている。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// ルールを評価するタイミング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Blur,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    #[serde(default)]
    pub required: bool,
    pub message: String,
    pub trigger: Trigger,
    #[serde(default, rename = "min", skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, rename = "max", skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl FieldRule {
    pub fn required(message: impl Into<String>, trigger: Trigger) -> Self {
        FieldRule {
            required: true,
            message: message.into(),
            trigger,
            min_len: None,
            max_len: None,
        }
    }

    fn check(&self, value: Option<&str>) -> bool {
        let value = value.unwrap_or("");
        if value.is_empty() {
            // 空値は required のときだけエラー
            return !self.required;
        }
        let len = value.chars().count();
        self.min_len.is_none_or(|min| len >= min) && self.max_len.is_none_or(|max| len <= max)
    }
}

/// 検証エラー 1 件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// フィールド名 → ルール列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormRules(BTreeMap<String, Vec<FieldRule>>);

impl FormRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// ログイン画面のルール (ユーザー名・パスワード必須、blur で検証)
    pub fn login() -> Self {
        FormRules::new()
            .rule(
                "username",
                FieldRule::required("Please enter username", Trigger::Blur),
            )
            .rule(
                "password",
                FieldRule::required("Please enter password", Trigger::Blur),
            )
    }

    pub fn rule(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.0.entry(field.into()).or_default().push(rule);
        self
    }

    /// `trigger` が None なら全ルール、指定があればそのタイミングのルールだけ評価する
    pub fn validate(
        &self,
        form: &HashMap<&str, &str>,
        trigger: Option<Trigger>,
    ) -> Result<(), Vec<FieldViolation>> {
        let violations: Vec<FieldViolation> = self
            .0
            .iter()
            .flat_map(|(field, rules)| rules.iter().map(move |rule| (field, rule)))
            .filter(|(_, rule)| trigger.is_none_or(|t| t == rule.trigger))
            .filter(|(field, rule)| !rule.check(form.get(field.as_str()).copied()))
            .map(|(field, rule)| FieldViolation {
                field: field.clone(),
                message: rule.message.clone(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rules_serialize_like_form_rules() {
        let json = serde_json::to_value(FormRules::login()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "password": [{"required": true, "message": "Please enter password", "trigger": "blur"}],
                "username": [{"required": true, "message": "Please enter username", "trigger": "blur"}]
            })
        );
    }

    #[test]
    fn empty_login_reports_both_fields() {
        let form = HashMap::from([("username", ""), ("password", "")]);
        let violations = FormRules::login().validate(&form, None).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["password", "username"]);
        assert_eq!(violations[1].message, "Please enter username");
    }

    #[test]
    fn missing_field_counts_as_empty() {
        let form = HashMap::from([("username", "admin")]);
        let violations = FormRules::login().validate(&form, Some(Trigger::Blur)).unwrap_err();
        assert_eq!(
            violations,
            [FieldViolation {
                field: "password".to_string(),
                message: "Please enter password".to_string(),
            }]
        );
    }

    #[test]
    fn filled_login_passes_and_trigger_filters() {
        let form = HashMap::from([("username", "admin"), ("password", "admin123")]);
        assert_eq!(FormRules::login().validate(&form, Some(Trigger::Blur)), Ok(()));
        // change トリガーのルールは無いので空フォームでも通る
        assert_eq!(
            FormRules::login().validate(&HashMap::new(), Some(Trigger::Change)),
            Ok(())
        );
    }

    #[test]
    fn length_bounds() {
        let rules = FormRules::new().rule(
            "password",
            FieldRule {
                min_len: Some(6),
                max_len: Some(18),
                ..FieldRule::required("6-18 characters", Trigger::Change)
            },
        );
        assert!(rules.validate(&HashMap::from([("password", "abc")]), None).is_err());
        assert!(rules.validate(&HashMap::from([("password", "abcdef")]), None).is_ok());
        assert!(rules
            .validate(&HashMap::from([("password", "a".repeat(19).as_str())]), None)
            .is_err());
    }
}
