//! E-mail allow-list checked before every operation.

use store_tracker_core::error::{CoreError, CoreResult};

/// Allow-list of signed-in accounts. An empty list denies everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGate {
    allowed: Vec<String>,
}

impl AccessGate {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// 检查当前账户是否在允许列表中（忽略大小写）
    pub fn check(&self, email: Option<&str>) -> CoreResult<()> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Err(CoreError::AccessDenied("not signed in".to_string()));
        };
        if self.allowed.contains(&email.to_lowercase()) {
            Ok(())
        } else {
            log::warn!("Access denied for {email}");
            Err(CoreError::AccessDenied(email.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_denies_everyone() {
        let gate = AccessGate::new(Vec::<String>::new());
        assert!(gate.check(Some("a@example.com")).is_err());
    }

    #[test]
    fn allowed_email_is_case_insensitive() {
        let gate = AccessGate::new(["Owner@Example.com"]);
        assert!(gate.check(Some(" owner@example.com ")).is_ok());
        assert!(matches!(
            gate.check(Some("other@example.com")),
            Err(CoreError::AccessDenied(_))
        ));
        assert!(gate.check(None).is_err());
    }
}
