//! Service update and modification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Maintenance event logged against a car
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceUpdate {
    pub id: Uuid,
    pub car_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Modification performed as part of a service update
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mod {
    pub id: Uuid,
    pub service_update_id: Uuid,
    pub car_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub mod_type: String,
    pub mileage: i32,
    pub description: String,
}

/// Mod entry as submitted by a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModInput {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub mod_type: Option<String>,
    pub mileage: Option<i32>,
    pub description: Option<String>,
}

/// Mod ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMod {
    pub name: String,
    pub mod_type: String,
    pub mileage: i32,
    pub description: String,
}

/// Drop unnamed entries and fill defaults; negative mileage is rejected
pub fn normalize_mods(inputs: Vec<ModInput>) -> Result<Vec<NewMod>, String> {
    let mut mods = Vec::with_capacity(inputs.len());

    for input in inputs {
        let Some(name) = input.name.filter(|n| !n.trim().is_empty()) else {
            continue;
        };

        let mileage = input.mileage.unwrap_or(0);
        if mileage < 0 {
            return Err("Mileage cannot be negative".to_string());
        }

        mods.push(NewMod {
            name,
            mod_type: input.mod_type.unwrap_or_default(),
            mileage,
            description: input.description.unwrap_or_default(),
        });
    }

    Ok(mods)
}

#[derive(Debug, Deserialize)]
pub struct CreateModsRequest {
    pub car_id: Option<Uuid>,
    #[serde(alias = "su_id")]
    pub service_update_id: Option<Uuid>,
    pub mods: Option<Vec<ModInput>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceUpdateRequest {
    pub car_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mods: Vec<ModInput>,
}

/// Service update together with the mods created alongside it
#[derive(Debug, Clone, Serialize)]
pub struct ServiceUpdateWithMods {
    pub update: ServiceUpdate,
    pub mods: Vec<Mod>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ModInput {
        ModInput {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unnamed_entries_are_dropped_and_defaults_filled() {
        let mods = normalize_mods(vec![
            named("Coilovers"),
            ModInput::default(),
            ModInput {
                name: Some("  ".into()),
                mileage: Some(10),
                ..Default::default()
            },
        ])
        .unwrap();

        assert_eq!(
            mods,
            vec![NewMod {
                name: "Coilovers".into(),
                mod_type: String::new(),
                mileage: 0,
                description: String::new(),
            }]
        );
    }

    #[test]
    fn negative_mileage_is_rejected() {
        let input = ModInput {
            mileage: Some(-5),
            ..named("Exhaust")
        };
        assert!(normalize_mods(vec![input]).is_err());
    }

    #[test]
    fn mod_type_uses_type_on_the_wire() {
        let input: ModInput =
            serde_json::from_str(r#"{"name":"Intake","type":"engine","mileage":1200}"#).unwrap();
        assert_eq!(input.mod_type.as_deref(), Some("engine"));
        assert_eq!(input.mileage, Some(1200));

        let request: CreateModsRequest = serde_json::from_str(&format!(
            r#"{{"car_id":"{}","su_id":"{}","mods":[]}}"#,
            Uuid::nil(),
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(request.service_update_id, Some(Uuid::nil()));
    }
}
