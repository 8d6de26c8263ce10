//! Query-string form of a Get command.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use url::form_urlencoded;

use crate::error::CodecError;
use crate::types::{Commands, GetCmd, Task, LIMIT_KEY, OFFSET_KEY};

const RESOURCE_TYPE_PARAM: &str = "resource_type";
const USER_PARAM: &str = "zdnsuser";
const IGNORED_PARAM: &str = "_";

/// Formats a condition value for the query string.
///
/// Strings go out bare; every other value uses its JSON text.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Query parameters for `cmd`, sorted by key.
///
/// A condition named `resource_type`, `zdnsuser` or `_` would not survive
/// decoding, so it is rejected.
pub(crate) fn encode_get(user: &str, cmd: &GetCmd) -> Result<BTreeMap<String, String>, CodecError> {
    if let Some(key) = cmd
        .conds
        .keys()
        .find(|key| matches!(key.as_str(), RESOURCE_TYPE_PARAM | USER_PARAM | IGNORED_PARAM))
    {
        return Err(CodecError::ReservedCondition(key.clone()));
    }

    let mut params: BTreeMap<String, String> = cmd
        .conds
        .iter()
        .map(|(key, value)| (key.clone(), format_value(value)))
        .collect();
    params.insert(RESOURCE_TYPE_PARAM.to_string(), cmd.resource_type.clone());
    params.insert(USER_PARAM.to_string(), user.to_string());
    Ok(params)
}

fn parse_int(param: &'static str, value: &str) -> Result<i64, CodecError> {
    value.parse().map_err(|_| CodecError::InvalidInteger {
        param,
        value: value.to_string(),
    })
}

/// Decodes a GET query string into a single-command Get task.
///
/// The first occurrence of a repeated key wins. Pagination is injected
/// into the conditions only when both `offset` and `limit` are present,
/// `limit > 0` and `offset >= 0`.
pub(crate) fn decode_get(query: &str) -> Result<Task, CodecError> {
    let mut user = String::new();
    let mut cmd = GetCmd::default();
    let mut offset = None;
    let mut limit = None;
    let mut seen = HashSet::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if !seen.insert(key.clone()) {
            continue;
        }
        match key.as_ref() {
            RESOURCE_TYPE_PARAM => cmd.resource_type = value.into_owned(),
            USER_PARAM => user = value.into_owned(),
            OFFSET_KEY => offset = Some(parse_int(OFFSET_KEY, &value)?),
            LIMIT_KEY => limit = Some(parse_int(LIMIT_KEY, &value)?),
            IGNORED_PARAM => {}
            _ => {
                cmd.conds
                    .insert(key.into_owned(), Value::String(value.into_owned()));
            }
        }
    }

    if cmd.resource_type.is_empty() {
        return Err(CodecError::EmptyResourceType);
    }

    if let (Some(offset), Some(limit)) = (offset, limit) {
        if limit > 0 && offset >= 0 {
            cmd.conds.insert(OFFSET_KEY.to_string(), Value::from(offset));
            cmd.conds.insert(LIMIT_KEY.to_string(), Value::from(limit));
        }
    }

    Ok(Task::from_batch(user, Commands::Get(vec![cmd])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn only_get(task: &Task) -> &GetCmd {
        match task.cmds() {
            Some(Commands::Get(cmds)) if cmds.len() == 1 => &cmds[0],
            other => panic!("expected one get command, got {other:?}"),
        }
    }

    #[test]
    fn plain_conditions_are_strings() {
        let task = decode_get("resource_type=host&zdnsuser=alice&name=web1").unwrap();
        assert_eq!(task.user, "alice");
        let cmd = only_get(&task);
        assert_eq!(cmd.resource_type, "host");
        assert_eq!(Value::Object(cmd.conds.clone()), json!({"name": "web1"}));
    }

    #[test]
    fn underscore_is_ignored() {
        let task = decode_get("resource_type=host&_=1700000000").unwrap();
        assert!(only_get(&task).conds.is_empty());
    }

    #[test]
    fn missing_or_empty_resource_type_fails() {
        assert!(matches!(
            decode_get("name=web1"),
            Err(CodecError::EmptyResourceType)
        ));
        assert!(matches!(
            decode_get("resource_type=&name=web1"),
            Err(CodecError::EmptyResourceType)
        ));
    }

    #[test]
    fn empty_user_is_accepted() {
        let task = decode_get("resource_type=host&zdnsuser=").unwrap();
        assert_eq!(task.user, "");
    }

    #[test]
    fn malformed_integers_fail() {
        assert!(matches!(
            decode_get("resource_type=host&offset=abc&limit=5"),
            Err(CodecError::InvalidInteger { param: "offset", .. })
        ));
        assert!(matches!(
            decode_get("resource_type=host&limit=five"),
            Err(CodecError::InvalidInteger { param: "limit", .. })
        ));
    }

    #[test]
    fn pagination_requires_both_and_positive_limit() {
        let task = decode_get("resource_type=host&limit=5&offset=0").unwrap();
        assert_eq!(
            Value::Object(only_get(&task).conds.clone()),
            json!({"offset": 0, "limit": 5})
        );

        let task = decode_get("resource_type=host&limit=0&offset=3").unwrap();
        assert!(only_get(&task).conds.is_empty());

        let task = decode_get("resource_type=host&limit=5").unwrap();
        assert!(only_get(&task).conds.is_empty());

        let task = decode_get("resource_type=host&limit=5&offset=-1").unwrap();
        assert!(only_get(&task).conds.is_empty());
    }

    #[test]
    fn first_value_of_repeated_key_wins() {
        let task = decode_get("resource_type=host&name=a&name=b").unwrap();
        assert_eq!(only_get(&task).conds["name"], json!("a"));
    }

    #[test]
    fn encode_formats_values_uniformly() {
        let cmd = GetCmd::new("host")
            .with_cond("name", "web 1")
            .with_cond("ttl", 300)
            .with_cond("enabled", true);
        let params = encode_get("alice", &cmd).unwrap();
        assert_eq!(params["name"], "web 1");
        assert_eq!(params["ttl"], "300");
        assert_eq!(params["enabled"], "true");
        assert_eq!(params["resource_type"], "host");
        assert_eq!(params["zdnsuser"], "alice");
    }

    #[test]
    fn reserved_condition_keys_are_rejected() {
        for key in ["_", "zdnsuser", "resource_type"] {
            let cmd = GetCmd::new("host").with_cond(key, "x");
            let err = encode_get("alice", &cmd).unwrap_err();
            assert!(matches!(err, CodecError::ReservedCondition(ref k) if k == key));
        }
    }
}
