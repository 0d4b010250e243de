//! The controlled effect-key vocabulary.
//!
//! Data files name effects with a fixed dotted grammar:
//!
//! ```text
//! damage.physical | damage.magical | damage.spiritual | damage.true
//! heal.hp
//! restore.<resource>      drain.<resource>
//! buff.<attribute>        debuff.<attribute>      (+ companion "duration", "percent")
//! status.<status>         (value = duration in turns)
//! terrain.<kind>
//! special.<name>
//! ```
//!
//! Unknown keys are rejected with a diagnostic instead of being guessed at.
//! [`translate_legacy_key`] maps the free-form names older files used
//! (`base_damage`, `mp_restoration`, …) onto the grammar before parsing.

use std::collections::BTreeMap;
use std::str::FromStr;

use battle_core::{
    AttributeKind, DamageType, Effect, ResourceKind, StatusKind, TerrainKind,
};

/// Value side of one effects-map entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum EffectValue {
    Number(i32),
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl EffectValue {
    fn as_number(&self) -> Option<i32> {
        match self {
            EffectValue::Number(n) => Some(*n),
            EffectValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Rejected effect key with its diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EffectKeyError {
    #[error("unknown effect key '{0}'")]
    UnknownKey(String),

    #[error("effect key '{key}' has an unknown subject '{subject}'")]
    UnknownSubject { key: String, subject: String },

    #[error("effect key '{0}' needs a numeric value")]
    NotANumber(String),
}

/// Keys that parameterize a sibling entry rather than naming an effect.
const COMPANION_KEYS: &[&str] = &[
    "duration",
    "percent",
    "affected_stats",
    "range",
    "area_of_effect",
    "target_type",
    "guaranteed_hit",
];

/// One-time translation table for legacy free-form effect names.
pub fn translate_legacy_key(key: &str) -> Option<&'static str> {
    match key {
        "base_damage" | "physical_damage" => Some("damage.physical"),
        "magical_damage" | "magic_damage" => Some("damage.magical"),
        "spiritual_damage" => Some("damage.spiritual"),
        "true_damage" => Some("damage.true"),
        "healing" | "healing_amount" | "hp_restoration" => Some("heal.hp"),
        "mp_restoration" => Some("restore.mp"),
        "ap_restoration" => Some("restore.ap"),
        "rage_restoration" => Some("restore.rage"),
        "kwan_restoration" => Some("restore.kwan"),
        "mp_drain" => Some("drain.mp"),
        _ => None,
    }
}

/// Parses a whole effects map into an ordered effect list.
///
/// Iteration is key-sorted, so the resulting order is stable across loads.
/// The legacy `stat_bonus` + `affected_stats` + `duration` triple expands to
/// one `StatModifier` per named attribute.
pub fn parse_effects(
    effects: &BTreeMap<String, EffectValue>,
) -> Result<Vec<Effect>, EffectKeyError> {
    let duration = effects
        .get("duration")
        .and_then(EffectValue::as_number)
        .map(|d| d.max(0) as u32)
        .unwrap_or(0);
    let percent = matches!(effects.get("percent"), Some(EffectValue::Flag(true)));

    let mut out = Vec::new();
    for (key, value) in effects {
        if COMPANION_KEYS.contains(&key.as_str()) {
            continue;
        }

        // Legacy stat_bonus expands across its companion attribute list.
        if key == "stat_bonus" {
            let amount = value
                .as_number()
                .ok_or_else(|| EffectKeyError::NotANumber(key.clone()))?;
            let stats = match effects.get("affected_stats") {
                Some(EffectValue::List(stats)) => stats.clone(),
                _ => Vec::new(),
            };
            for stat in stats {
                let attribute = AttributeKind::from_str(&stat).map_err(|_| {
                    EffectKeyError::UnknownSubject {
                        key: key.clone(),
                        subject: stat.clone(),
                    }
                })?;
                out.push(Effect::StatModifier {
                    attribute,
                    amount,
                    percent,
                    duration,
                });
            }
            continue;
        }

        let canonical = translate_legacy_key(key).unwrap_or(key);
        out.push(parse_one(canonical, key, value, duration, percent)?);
    }
    Ok(out)
}

fn parse_one(
    canonical: &str,
    original_key: &str,
    value: &EffectValue,
    duration: u32,
    percent: bool,
) -> Result<Effect, EffectKeyError> {
    let (family, subject) = canonical
        .split_once('.')
        .ok_or_else(|| EffectKeyError::UnknownKey(original_key.to_string()))?;

    let number = || {
        value
            .as_number()
            .ok_or_else(|| EffectKeyError::NotANumber(original_key.to_string()))
    };
    let bad_subject = || EffectKeyError::UnknownSubject {
        key: original_key.to_string(),
        subject: subject.to_string(),
    };

    match family {
        "damage" => {
            let damage_type = DamageType::from_str(subject).map_err(|_| bad_subject())?;
            Ok(Effect::Damage {
                magnitude: number()?,
                damage_type,
            })
        }
        "heal" => {
            if subject != "hp" {
                return Err(bad_subject());
            }
            Ok(Effect::Heal {
                magnitude: number()?,
            })
        }
        "restore" | "drain" => {
            let resource = ResourceKind::from_str(subject).map_err(|_| bad_subject())?;
            let amount = number()?;
            Ok(Effect::ResourceChange {
                resource,
                amount: if family == "drain" { -amount } else { amount },
            })
        }
        "buff" | "debuff" => {
            let attribute = AttributeKind::from_str(subject).map_err(|_| bad_subject())?;
            let amount = number()?;
            Ok(Effect::StatModifier {
                attribute,
                amount: if family == "debuff" { -amount } else { amount },
                percent,
                duration,
            })
        }
        "status" => {
            let kind = StatusKind::from_str(subject).map_err(|_| bad_subject())?;
            Ok(Effect::Status {
                kind,
                duration: number()?.max(0) as u32,
            })
        }
        "terrain" => {
            let terrain = TerrainKind::from_str(subject).map_err(|_| bad_subject())?;
            Ok(Effect::TerrainChange { terrain })
        }
        "special" => Ok(Effect::Special {
            name: subject.to_string(),
            magnitude: value.as_number().unwrap_or(0),
        }),
        _ => Err(EffectKeyError::UnknownKey(original_key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, EffectValue)]) -> BTreeMap<String, EffectValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn grammar_keys_parse() {
        let effects = parse_effects(&map(&[
            ("damage.magical", EffectValue::Number(15)),
            ("restore.mp", EffectValue::Number(4)),
        ]))
        .unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::Damage {
                    magnitude: 15,
                    damage_type: DamageType::Magical
                },
                Effect::ResourceChange {
                    resource: ResourceKind::Mp,
                    amount: 4
                },
            ]
        );
    }

    #[test]
    fn legacy_names_translate() {
        let effects = parse_effects(&map(&[
            ("base_damage", EffectValue::Number(12)),
            ("mp_restoration", EffectValue::Number(3)),
        ]))
        .unwrap();
        assert!(matches!(
            effects[0],
            Effect::Damage {
                magnitude: 12,
                damage_type: DamageType::Physical
            }
        ));
        assert!(matches!(
            effects[1],
            Effect::ResourceChange {
                resource: ResourceKind::Mp,
                amount: 3
            }
        ));
    }

    #[test]
    fn stat_bonus_expands_per_attribute() {
        let effects = parse_effects(&map(&[
            ("stat_bonus", EffectValue::Number(5)),
            ("duration", EffectValue::Number(3)),
            (
                "affected_stats",
                EffectValue::List(vec!["strength".into(), "speed".into()]),
            ),
        ]))
        .unwrap();
        assert_eq!(effects.len(), 2);
        assert!(effects.iter().all(|e| matches!(
            e,
            Effect::StatModifier {
                amount: 5,
                duration: 3,
                percent: false,
                ..
            }
        )));
    }

    #[test]
    fn unknown_keys_are_rejected_with_diagnostics() {
        let err = parse_effects(&map(&[("explode_everything", EffectValue::Number(1))]))
            .unwrap_err();
        assert_eq!(err, EffectKeyError::UnknownKey("explode_everything".into()));

        let err = parse_effects(&map(&[("damage.sonic", EffectValue::Number(1))])).unwrap_err();
        assert!(matches!(err, EffectKeyError::UnknownSubject { .. }));
    }

    #[test]
    fn status_value_is_duration() {
        let effects =
            parse_effects(&map(&[("status.stunned", EffectValue::Number(2))])).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Status {
                kind: StatusKind::Stunned,
                duration: 2
            }]
        );
    }

    #[test]
    fn drain_negates_the_amount() {
        let effects = parse_effects(&map(&[("drain.rage", EffectValue::Number(10))])).unwrap();
        assert_eq!(
            effects,
            vec![Effect::ResourceChange {
                resource: ResourceKind::Rage,
                amount: -10
            }]
        );
    }
}
