use crate::config::Config;
use crate::navigation::NavigationState;
use crate::render::{self, MonthView};
use crate::service::TaskMutationService;
use crate::storage::TaskStore;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("name must not be empty")]
    EmptyName,
}

/// Maps a name/passphrase pair to a storage key. The mapping only picks a
/// file; it is not a credential check and the passphrase is not protected.
pub fn derive_user_key(name: &str, passphrase: &str) -> Result<String, SessionError> {
    let name = normalize(name);
    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    Ok(format!("{}_{}", name, normalize(passphrase)))
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Everything one logged-in user works with, passed explicitly to the front ends.
#[derive(Debug)]
pub struct Session {
    pub key: String,
    pub config: Config,
    pub service: TaskMutationService,
    pub nav: NavigationState,
}

impl Session {
    pub fn login(name: &str, passphrase: &str, config: Config) -> Result<Self> {
        Session::login_on(name, passphrase, config, Local::now().date_naive())
    }

    pub fn login_on(name: &str, passphrase: &str, config: Config, today: NaiveDate) -> Result<Self> {
        let key = derive_user_key(name, passphrase)?;
        let store = TaskStore::open(&config.data_dir, &key)
            .with_context(|| format!("opening task store for {}", key))?;
        log::info!("session for {} with {} tasks", key, store.tasks().len());
        Ok(Session {
            key,
            config,
            service: TaskMutationService::new(store),
            nav: NavigationState::starting_at(today),
        })
    }

    /// Recomputes the displayed month from the store. Cheap enough to call
    /// after every interaction.
    pub fn month_view(&self) -> Result<MonthView> {
        let view = render::render_month(
            self.nav.display_year(),
            self.nav.display_month(),
            self.config.week_start,
            self.service.tasks(),
        )?;
        Ok(view)
    }
}
