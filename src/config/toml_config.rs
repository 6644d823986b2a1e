use crate::adapters::http::{
    AdzunaSettings, DEFAULT_COUNTRY, DEFAULT_ENDPOINT, DEFAULT_PAGE_DELAY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESULTS_PER_PAGE, MAX_PAGES,
};
use crate::adapters::mail::{SmtpSettings, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, DEFAULT_SMTP_TIMEOUT};
use crate::core::digest::{
    default_remote_keywords, DigestSettings, DEFAULT_CURRENCY, DEFAULT_DESCRIPTION_LIMIT,
    TRUNCATION_MARKER,
};
use crate::core::engine::RunPolicy;
use crate::core::{Locality, SearchQuery};
use crate::utils::error::{DigestError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_TERMS: &str = "Tester";
pub const DEFAULT_LEDGER_PATH: &str = "sent_jobs.txt";

/// String whose value never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub digest: FormatConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub app_id: String,
    pub app_key: Secret,
    pub endpoint: Option<String>,
    pub country: Option<String>,
    pub terms: Option<String>,
    pub location: Option<String>,
    pub distance_km: Option<u32>,
    pub title_only: Option<bool>,
    pub results_per_page: Option<u32>,
    pub max_pages: Option<u32>,
    pub request_timeout_seconds: Option<u64>,
    pub page_delay_millis: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatConfig {
    pub priority_cities: Option<Vec<String>>,
    pub remote_keywords: Option<Vec<String>>,
    pub default_currency: Option<String>,
    pub description_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: String,
    pub password: Secret,
    /// Defaults to `username`.
    pub from: Option<String>,
    /// Defaults to the sender address.
    pub to: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub skip_weekends: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl DigestConfig {
    /// Loads a TOML file, substituting `${VAR}` from the process environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DigestError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with(content, |name| std::env::var(name).ok())
    }

    pub fn from_toml_str_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processed_content = Self::substitute_vars(content, lookup)?;

        toml::from_str(&processed_content).map_err(|e| DigestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}`; unknown variables are left in place and
    /// reported by validation.
    fn substitute_vars<F>(content: &str, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        use regex::Regex;
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            DigestError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Builds the configuration from `ADZUNA_*`, `EMAIL*`, `SEARCH_TERMS` and
    /// friends, matching a plain `.env` deployment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_empty(lookup(name));
        let required = |name: &str| {
            var(name).ok_or_else(|| DigestError::MissingConfigError {
                field: name.to_string(),
            })
        };

        Ok(Self {
            search: SearchConfig {
                app_id: required("ADZUNA_APP_ID")?,
                app_key: Secret::new(required("ADZUNA_APP_KEY")?),
                endpoint: var("ADZUNA_ENDPOINT"),
                country: var("ADZUNA_COUNTRY"),
                terms: var("SEARCH_TERMS"),
                location: var("LOCATION"),
                distance_km: parse_var("DISTANCE", var("DISTANCE"))?,
                title_only: parse_var("TITLE_ONLY", var("TITLE_ONLY"))?,
                results_per_page: parse_var("RESULTS_PER_PAGE", var("RESULTS_PER_PAGE"))?,
                max_pages: parse_var("MAX_PAGES", var("MAX_PAGES"))?,
                request_timeout_seconds: parse_var(
                    "REQUEST_TIMEOUT_SECONDS",
                    var("REQUEST_TIMEOUT_SECONDS"),
                )?,
                page_delay_millis: parse_var("PAGE_DELAY_MILLIS", var("PAGE_DELAY_MILLIS"))?,
            },
            ledger: LedgerConfig {
                path: var("SENT_JOBS_FILE"),
            },
            digest: FormatConfig {
                priority_cities: var("PRIORITY_CITIES").map(|v| split_list(&v)),
                remote_keywords: var("REMOTE_KEYWORDS").map(|v| split_list(&v)),
                default_currency: var("DEFAULT_CURRENCY"),
                description_limit: parse_var("DESCRIPTION_LIMIT", var("DESCRIPTION_LIMIT"))?,
            },
            mail: MailConfig {
                smtp_host: var("SMTP_HOST"),
                smtp_port: parse_var("SMTP_PORT", var("SMTP_PORT"))?,
                username: required("EMAIL")?,
                password: Secret::new(required("EMAIL_PASSWORD")?),
                from: None,
                to: var("EMAIL_TO"),
                timeout_seconds: None,
            },
            schedule: ScheduleConfig {
                skip_weekends: parse_var("SKIP_WEEKENDS", var("SKIP_WEEKENDS"))?,
            },
        })
    }

    pub fn endpoint(&self) -> &str {
        self.search.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn country(&self) -> &str {
        self.search.country.as_deref().unwrap_or(DEFAULT_COUNTRY)
    }

    pub fn terms(&self) -> &str {
        self.search.terms.as_deref().unwrap_or(DEFAULT_SEARCH_TERMS)
    }

    pub fn results_per_page(&self) -> u32 {
        self.search.results_per_page.unwrap_or(DEFAULT_RESULTS_PER_PAGE)
    }

    pub fn max_pages(&self) -> u32 {
        self.search.max_pages.unwrap_or(MAX_PAGES)
    }

    pub fn request_timeout(&self) -> Duration {
        self.search
            .request_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn page_delay(&self) -> Duration {
        self.search
            .page_delay_millis
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PAGE_DELAY)
    }

    pub fn ledger_path(&self) -> &str {
        self.ledger.path.as_deref().unwrap_or(DEFAULT_LEDGER_PATH)
    }

    pub fn description_limit(&self) -> usize {
        self.digest
            .description_limit
            .unwrap_or(DEFAULT_DESCRIPTION_LIMIT)
    }

    pub fn sender(&self) -> &str {
        self.mail.from.as_deref().unwrap_or(&self.mail.username)
    }

    pub fn recipient(&self) -> &str {
        self.mail.to.as_deref().unwrap_or_else(|| self.sender())
    }

    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            terms: self.terms().to_string(),
            location: non_empty(self.search.location.clone()),
            distance_km: self.search.distance_km,
            title_only: self.search.title_only.unwrap_or(true),
        }
    }

    pub fn adzuna_settings(&self) -> AdzunaSettings {
        AdzunaSettings {
            endpoint: self.endpoint().to_string(),
            country: self.country().to_string(),
            app_id: self.search.app_id.clone(),
            app_key: self.search.app_key.expose().to_string(),
            results_per_page: self.results_per_page(),
            max_pages: self.max_pages(),
            request_timeout: self.request_timeout(),
            page_delay: self.page_delay(),
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self
                .mail
                .smtp_host
                .clone()
                .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: self.mail.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            username: self.mail.username.clone(),
            password: self.mail.password.expose().to_string(),
            from: self.sender().to_string(),
            timeout: self
                .mail
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SMTP_TIMEOUT),
        }
    }

    pub fn digest_settings(&self) -> DigestSettings {
        DigestSettings {
            priority_cities: self.digest.priority_cities.clone().unwrap_or_default(),
            remote_keywords: self
                .digest
                .remote_keywords
                .clone()
                .unwrap_or_else(default_remote_keywords),
            default_currency: self
                .digest
                .default_currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            description_limit: self.description_limit(),
        }
    }

    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            skip_weekends: self.schedule.skip_weekends.unwrap_or(false),
        }
    }
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| DigestError::InvalidConfigValueError {
                    field: name.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

impl Validate for DigestConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_required_string("search.app_id", &self.search.app_id)?;
        validation::validate_required_string("search.app_key", self.search.app_key.expose())?;
        validation::validate_url("search.endpoint", self.endpoint())?;

        let country = self.country();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(DigestError::InvalidConfigValueError {
                field: "search.country".to_string(),
                value: country.to_string(),
                reason: "Expected a two-letter lowercase country code such as `pl`".to_string(),
            });
        }

        validation::validate_non_empty_string("search.terms", self.terms())?;
        validation::validate_resolved("search.terms", self.terms())?;
        if let Some(location) = &self.search.location {
            validation::validate_resolved("search.location", location)?;
        }
        validation::validate_range("search.results_per_page", self.results_per_page(), 1, 100)?;
        validation::validate_range("search.max_pages", self.max_pages(), 1, 20)?;
        validation::validate_range(
            "search.request_timeout_seconds",
            self.request_timeout().as_secs(),
            1,
            300,
        )?;

        validation::validate_path("ledger.path", self.ledger_path())?;

        validation::validate_positive_number(
            "digest.description_limit",
            self.description_limit(),
            TRUNCATION_MARKER.len() + 1,
        )?;
        let settings = self.digest_settings();
        for city in &settings.priority_cities {
            validation::validate_non_empty_string("digest.priority_cities", city)?;
            let reserved = [Locality::Remote.label(), Locality::Unclassified.label()];
            if reserved.iter().any(|label| city.trim().eq_ignore_ascii_case(label)) {
                return Err(DigestError::InvalidConfigValueError {
                    field: "digest.priority_cities".to_string(),
                    value: city.clone(),
                    reason: "Name is reserved for the remote and unclassified groups".to_string(),
                });
            }
        }
        for keyword in &settings.remote_keywords {
            validation::validate_non_empty_string("digest.remote_keywords", keyword)?;
        }
        validation::validate_non_empty_string("digest.default_currency", &settings.default_currency)?;

        if let Some(host) = &self.mail.smtp_host {
            validation::validate_non_empty_string("mail.smtp_host", host)?;
        }
        validation::validate_required_string("mail.username", &self.mail.username)?;
        validation::validate_required_string("mail.password", self.mail.password.expose())?;
        validation::validate_email("mail.from", self.sender())?;
        validation::validate_email("mail.to", self.recipient())?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}
