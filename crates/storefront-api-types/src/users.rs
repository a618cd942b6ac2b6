use serde::{Deserialize, Serialize};

/// Authenticated user as returned by login, register and profile update.
///
/// Persisted verbatim under the `userInfo` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Self-service profile edit; `password` is only sent when changing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Admin edit of another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_record_uses_backend_field_names() {
        let record: SessionRecord = serde_json::from_str(
            r#"{"_id":"u1","name":"Admin","email":"admin@example.com","isAdmin":true,"token":"t0k"}"#,
        )
        .expect("valid record");
        assert!(record.is_admin);

        let value = serde_json::to_value(&record).expect("serializable");
        assert_eq!(value["_id"], "u1");
        assert_eq!(value["isAdmin"], true);
    }

    #[test]
    fn profile_update_omits_unchanged_password() {
        let update = ProfileUpdate {
            id: "u1".into(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password: None,
        };
        let value = serde_json::to_value(&update).expect("serializable");
        assert!(value.get("password").is_none());
    }
}
