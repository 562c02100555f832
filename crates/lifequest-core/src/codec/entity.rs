//! エンティティドキュメント（角色・技能・属性・资源）のフィールド

use serde_json::Value;

use super::fields;
use crate::domain::{EntityClass, ProgressionEntity, QuestError, QuestResult};
use crate::ports::Metadata;

pub const FIELD_LEVEL: &str = "等级";
pub const FIELD_CHARACTER_EXPERIENCE: &str = "经验值";
pub const FIELD_SKILL_EXPERIENCE: &str = "当前经验";
pub const FIELD_THRESHOLD: &str = "升级需要经验";
pub const FIELD_FLAT_VALUE: &str = "当前值";

fn experience_field(class: EntityClass) -> &'static str {
    match class {
        EntityClass::Character => FIELD_CHARACTER_EXPERIENCE,
        EntityClass::Skill => FIELD_SKILL_EXPERIENCE,
    }
}

/// 欠けているフィールドは新規エンティティの既定値
pub fn decode_progression(class: EntityClass, metadata: &Metadata) -> QuestResult<ProgressionEntity> {
    let fresh = ProgressionEntity::fresh(class);
    let level = match fields::unsigned(metadata, FIELD_LEVEL)? {
        Some(level) => u32::try_from(level)
            .map_err(|_| QuestError::parse(FIELD_LEVEL, "level out of range"))?,
        None => fresh.level(),
    };
    let experience = fields::unsigned(metadata, experience_field(class))?.unwrap_or(0);
    let threshold = fields::unsigned(metadata, FIELD_THRESHOLD)?.unwrap_or(fresh.experience_threshold());
    ProgressionEntity::from_parts(class, level, experience, threshold)
}

pub fn encode_progression(entity: &ProgressionEntity) -> Metadata {
    let mut out = Metadata::new();
    out.insert(FIELD_LEVEL.into(), Value::from(entity.level()));
    out.insert(
        experience_field(entity.class()).into(),
        Value::from(entity.current_experience()),
    );
    out.insert(FIELD_THRESHOLD.into(), Value::from(entity.experience_threshold()));
    out
}

pub fn decode_flat_value(metadata: &Metadata) -> QuestResult<i64> {
    Ok(fields::signed(metadata, FIELD_FLAT_VALUE)?.unwrap_or(0))
}

pub fn encode_flat_value(value: i64) -> Metadata {
    let mut out = Metadata::new();
    out.insert(FIELD_FLAT_VALUE.into(), Value::from(value));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn empty_character_document_is_a_fresh_character() {
        let c = decode_progression(EntityClass::Character, &Metadata::new()).unwrap();
        assert_eq!(c, ProgressionEntity::fresh(EntityClass::Character));
    }

    #[test]
    fn skill_uses_its_own_experience_field() {
        let m = meta(json!({ "等级": 3, "当前经验": 40, "升级需要经验": 300, "经验值": 999 }));
        let s = decode_progression(EntityClass::Skill, &m).unwrap();
        assert_eq!((s.level(), s.current_experience(), s.experience_threshold()), (3, 40, 300));

        let encoded = encode_progression(&s);
        assert_eq!(encoded["当前经验"], json!(40));
        assert!(!encoded.contains_key("经验值"));
    }

    #[test]
    fn over_threshold_storage_is_normalized_on_decode() {
        let m = meta(json!({ "等级": 1, "经验值": 1500, "升级需要经验": 1000 }));
        let c = decode_progression(EntityClass::Character, &m).unwrap();
        assert_eq!((c.level(), c.current_experience(), c.experience_threshold()), (2, 500, 2000));
    }

    #[test]
    fn zero_level_is_rejected() {
        let m = meta(json!({ "等级": 0 }));
        assert!(matches!(
            decode_progression(EntityClass::Character, &m),
            Err(QuestError::Parse { .. })
        ));
    }

    #[test]
    fn flat_values_default_to_zero_and_allow_negatives() {
        assert_eq!(decode_flat_value(&Metadata::new()).unwrap(), 0);
        assert_eq!(decode_flat_value(&meta(json!({ "当前值": "-5" }))).unwrap(), -5);
        assert_eq!(encode_flat_value(12)["当前值"], json!(12));
        assert!(decode_flat_value(&meta(json!({ "当前值": "many" }))).is_err());
    }
}
