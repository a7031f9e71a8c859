//! Configuration loading and representation.
//!
//! Everything is read from environment variables with defaults suitable for
//! local development. `from_lookup` takes the variable source as a closure so
//! tests never touch the process environment.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;

use docflow_core::{DocumentType, TenantId};
use docflow_jobs::PollPolicy;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{key}: jitter window is inverted (min {min}s > max {max}s)")]
    InvertedJitter { key: &'static str, min: u64, max: u64 },
}

/// Queue names per document type, plus per-tenant invoice overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub invoice: String,
    pub grn: String,
    pub po: String,
    pub medical_referral_letter: String,
    pub invoice_overrides: HashMap<TenantId, String>,
}

impl QueueConfig {
    pub fn queue_for(&self, document_type: DocumentType) -> &str {
        match document_type {
            DocumentType::Invoice => &self.invoice,
            DocumentType::GoodsReceivedNote => &self.grn,
            DocumentType::PurchaseOrder => &self.po,
            DocumentType::MedicalReferralLetter => &self.medical_referral_letter,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            invoice: "docflow-invoice".to_string(),
            grn: "docflow-grn".to_string(),
            po: "docflow-po".to_string(),
            medical_referral_letter: "docflow-medical-referral-letter".to_string(),
            invoice_overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bucket assumed for continuations that do not name one.
    pub input_bucket: String,
    pub input_prefix: String,
    pub processed_prefix: String,
    pub output_bucket: String,
    pub output_prefix: String,
    /// Lower-case extensions without the dot.
    pub accepted_extensions: Vec<String>,
    pub excluded_tenants: HashSet<TenantId>,
    pub poll: PollPolicy,
    pub queues: QueueConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            input_bucket: "docflow-documents".to_string(),
            input_prefix: "input".to_string(),
            processed_prefix: "processed".to_string(),
            output_bucket: "docflow-extraction-output".to_string(),
            output_prefix: "output".to_string(),
            accepted_extensions: vec!["pdf".to_string()],
            excluded_tenants: HashSet::new(),
            poll: PollPolicy::default(),
            queues: QueueConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            match lookup(key) {
                None => Ok(default.to_string()),
                Some(v) if v.trim().is_empty() => Err(ConfigError::Empty(key)),
                Some(v) => Ok(v.trim().trim_matches('/').to_string()),
            }
        };

        let poll_defaults = defaults.poll;
        let max_checks = number(&lookup, "DOCFLOW_POLL_MAX_CHECKS", poll_defaults.max_checks)?;
        let delay_ms = number(
            &lookup,
            "DOCFLOW_POLL_DELAY_MS",
            poll_defaults.check_delay.as_millis() as u64,
        )?;
        let retry_budget = number(&lookup, "DOCFLOW_RETRY_BUDGET", poll_defaults.retry_budget)?;
        let jitter_min = number(
            &lookup,
            "DOCFLOW_JITTER_MIN_SECS",
            poll_defaults.jitter_min.as_secs(),
        )?;
        let jitter_max = number(
            &lookup,
            "DOCFLOW_JITTER_MAX_SECS",
            poll_defaults.jitter_max.as_secs(),
        )?;

        if max_checks == 0 {
            return Err(ConfigError::Invalid {
                key: "DOCFLOW_POLL_MAX_CHECKS",
                value: "0".to_string(),
            });
        }
        if retry_budget == 0 {
            return Err(ConfigError::Invalid {
                key: "DOCFLOW_RETRY_BUDGET",
                value: "0".to_string(),
            });
        }
        if jitter_min > jitter_max {
            return Err(ConfigError::InvertedJitter {
                key: "DOCFLOW_JITTER_MIN_SECS",
                min: jitter_min,
                max: jitter_max,
            });
        }

        let accepted_extensions = list(lookup("DOCFLOW_ACCEPTED_EXTENSIONS"))
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect::<Vec<_>>();

        let excluded_tenants = list(lookup("DOCFLOW_EXCLUDED_TENANTS"))
            .map(|t| {
                TenantId::parse(t.clone()).map_err(|_| ConfigError::Invalid {
                    key: "DOCFLOW_EXCLUDED_TENANTS",
                    value: t,
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let queue_defaults = defaults.queues;
        let queues = QueueConfig {
            invoice: text("DOCFLOW_QUEUE_INVOICE", &queue_defaults.invoice)?,
            grn: text("DOCFLOW_QUEUE_GRN", &queue_defaults.grn)?,
            po: text("DOCFLOW_QUEUE_PO", &queue_defaults.po)?,
            medical_referral_letter: text(
                "DOCFLOW_QUEUE_MEDICAL_REFERRAL_LETTER",
                &queue_defaults.medical_referral_letter,
            )?,
            invoice_overrides: overrides(lookup("DOCFLOW_INVOICE_QUEUE_OVERRIDES"))?,
        };

        Ok(Self {
            input_bucket: text("DOCFLOW_INPUT_BUCKET", &defaults.input_bucket)?,
            input_prefix: text("DOCFLOW_INPUT_PREFIX", &defaults.input_prefix)?,
            processed_prefix: text("DOCFLOW_PROCESSED_PREFIX", &defaults.processed_prefix)?,
            output_bucket: text("DOCFLOW_OUTPUT_BUCKET", &defaults.output_bucket)?,
            output_prefix: text("DOCFLOW_OUTPUT_PREFIX", &defaults.output_prefix)?,
            accepted_extensions: if accepted_extensions.is_empty() {
                defaults.accepted_extensions
            } else {
                accepted_extensions
            },
            excluded_tenants,
            poll: PollPolicy {
                max_checks,
                check_delay: Duration::from_millis(delay_ms),
                retry_budget,
                jitter_min: Duration::from_secs(jitter_min),
                jitter_max: Duration::from_secs(jitter_max),
            },
            queues,
        })
    }

    pub fn is_excluded(&self, tenant_id: &TenantId) -> bool {
        self.excluded_tenants.contains(tenant_id)
    }
}

fn number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn list(raw: Option<String>) -> impl Iterator<Item = String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
}

/// Parses `tenant=queue,tenant=queue`.
fn overrides(raw: Option<String>) -> Result<HashMap<TenantId, String>, ConfigError> {
    list(raw)
        .map(|pair| {
            let invalid = || ConfigError::Invalid {
                key: "DOCFLOW_INVOICE_QUEUE_OVERRIDES",
                value: pair.clone(),
            };
            let (tenant, queue) = pair.split_once('=').ok_or_else(invalid)?;
            let queue = queue.trim();
            if queue.is_empty() {
                return Err(invalid());
            }
            let tenant = TenantId::parse(tenant.trim()).map_err(|_| invalid())?;
            Ok((tenant, queue.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = OrchestratorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.poll.max_checks, 20);
        assert_eq!(config.poll.retry_budget, 4);
        assert_eq!(config.accepted_extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn reads_overrides_and_lists() {
        let config = OrchestratorConfig::from_lookup(lookup_from(&[
            ("DOCFLOW_POLL_MAX_CHECKS", "5"),
            ("DOCFLOW_POLL_DELAY_MS", "10"),
            ("DOCFLOW_RETRY_BUDGET", "2"),
            ("DOCFLOW_EXCLUDED_TENANTS", "FM, BR"),
            ("DOCFLOW_ACCEPTED_EXTENSIONS", ".PDF,tiff"),
            ("DOCFLOW_INVOICE_QUEUE_OVERRIDES", "BR=br-invoices"),
            ("DOCFLOW_INPUT_PREFIX", "incoming/"),
        ]))
        .unwrap();

        assert_eq!(config.poll.max_checks, 5);
        assert_eq!(config.poll.check_delay, Duration::from_millis(10));
        assert_eq!(config.poll.retry_budget, 2);
        assert!(config.is_excluded(&TenantId::parse("FM").unwrap()));
        assert!(config.is_excluded(&TenantId::parse("BR").unwrap()));
        assert_eq!(config.accepted_extensions, vec!["pdf", "tiff"]);
        assert_eq!(config.input_prefix, "incoming");
        assert_eq!(
            config
                .queues
                .invoice_overrides
                .get(&TenantId::parse("BR").unwrap())
                .map(String::as_str),
            Some("br-invoices")
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = OrchestratorConfig::from_lookup(lookup_from(&[("DOCFLOW_RETRY_BUDGET", "four")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DOCFLOW_RETRY_BUDGET",
                value: "four".to_string()
            }
        );

        let err = OrchestratorConfig::from_lookup(lookup_from(&[("DOCFLOW_POLL_MAX_CHECKS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DOCFLOW_POLL_MAX_CHECKS", .. }));
    }

    #[test]
    fn rejects_inverted_jitter_and_malformed_overrides() {
        let err = OrchestratorConfig::from_lookup(lookup_from(&[
            ("DOCFLOW_JITTER_MIN_SECS", "200"),
            ("DOCFLOW_JITTER_MAX_SECS", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedJitter { .. }));

        let err = OrchestratorConfig::from_lookup(lookup_from(&[(
            "DOCFLOW_INVOICE_QUEUE_OVERRIDES",
            "BR",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn empty_queue_name_is_rejected() {
        let err = OrchestratorConfig::from_lookup(lookup_from(&[("DOCFLOW_QUEUE_GRN", "  ")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Empty("DOCFLOW_QUEUE_GRN"));
    }
}
