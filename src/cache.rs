use crate::error::{Error, Result};
use crate::spec::{CacheableVariable, TransferSpec};
use serde_json::Value;
use tracing::{debug, warn};

/// 外部变量缓存协作方。refresh token 轮换后，声明为 cacheable 的
/// 配置字段通过该接口持久化，存储格式由实现方自行决定。
pub trait VariableCache {
    fn update(&self, variable: &CacheableVariable, new_value: &str) -> Result<()>;
}

/// 不需要跨进程持久化时使用的空实现。
#[derive(Debug, Default)]
pub struct NoopCache;

impl VariableCache for NoopCache {
    fn update(&self, _variable: &CacheableVariable, _new_value: &str) -> Result<()> {
        Ok(())
    }
}

/// 将声明的 cacheable 变量逐个解析出当前值并推送给缓存协作方。
/// 凭据刷新后立即调用，保证进程外状态（下次运行的 refresh token）不落后。
pub(crate) fn flush_cacheable_variables(
    spec: &TransferSpec,
    cache: &dyn VariableCache,
) -> Result<()> {
    let Some(variables) = &spec.cacheable_variables else {
        return Ok(());
    };
    let tree = serde_json::to_value(spec)
        .map_err(|e| Error::Parse(format!("failed to serialize spec for cache update: {e}")))?;
    for variable in variables {
        match resolve_spec_variable(&tree, &variable.variable_name) {
            Some(value) => {
                debug!(variable = %variable.variable_name, "updating cached variable");
                cache.update(variable, &value)?;
            }
            None => {
                warn!(
                    variable = %variable.variable_name,
                    "cacheable variable not found in spec, skipping cache update"
                );
            }
        }
    }
    Ok(())
}

/// 按点号路径在配置树中取值，如 `protocol.refreshToken`。
/// 字符串字段返回原值，其余类型返回 JSON 文本。
pub(crate) fn resolve_spec_variable(tree: &Value, dotted_path: &str) -> Option<String> {
    let mut current = tree;
    for segment in dotted_path.split('.') {
        current = current.get(segment)?;
    }
    match current {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingCache {
        updates: RefCell<Vec<(String, String)>>,
    }

    impl VariableCache for RecordingCache {
        fn update(&self, variable: &CacheableVariable, new_value: &str) -> Result<()> {
            self.updates
                .borrow_mut()
                .push((variable.variable_name.clone(), new_value.to_string()));
            Ok(())
        }
    }

    fn spec_with_cacheable() -> TransferSpec {
        serde_json::from_str(
            r#"{
                "protocol": {
                    "clientId": "client",
                    "tenantId": "tenant",
                    "refreshToken": "rotated-token"
                },
                "cacheableVariables": [
                    {"variableName": "protocol.refreshToken"},
                    {"variableName": "protocol.missingField"}
                ]
            }"#,
        )
        .expect("spec should deserialize")
    }

    #[test]
    fn resolves_dotted_paths_over_the_spec_tree() {
        let tree = serde_json::to_value(spec_with_cacheable()).unwrap();
        assert_eq!(
            resolve_spec_variable(&tree, "protocol.refreshToken").as_deref(),
            Some("rotated-token")
        );
        assert_eq!(resolve_spec_variable(&tree, "protocol.nope"), None);
        assert_eq!(resolve_spec_variable(&tree, "no.such.path"), None);
    }

    #[test]
    fn flush_updates_each_resolvable_variable_and_skips_missing() {
        let cache = RecordingCache {
            updates: RefCell::new(Vec::new()),
        };
        flush_cacheable_variables(&spec_with_cacheable(), &cache).expect("flush should succeed");
        let updates = cache.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "protocol.refreshToken");
        assert_eq!(updates[0].1, "rotated-token");
    }
}
