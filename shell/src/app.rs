//! Shell state and command dispatch.
//!
//! # Design
//! `App` owns the settings, the current `Session`, a shared `ApiClient` and
//! the last health indicator of each service.
//! Every API call is moved onto the blocking pool with `offload` and the
//! prompt waits for it, so commands run one at a time and the session is
//! replaced only after a call succeeds.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use bookdesk_core::{decode_catalog, ApiClient, CatalogQuery, Session, Settings, SettingsStore};
use tracing::info;

use crate::command::Command;
use crate::indicator::Indicator;
use crate::table::render_books;
use crate::worker::offload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<W: Write> {
    store: SettingsStore,
    settings: Settings,
    api: Arc<ApiClient>,
    session: Session,
    auth_health: Indicator,
    books_health: Indicator,
    out: W,
}

impl<W: Write> App<W> {
    /// Load settings from `store` and point a fresh client at them.
    pub fn new(store: SettingsStore, out: W) -> Self {
        let settings = store.load();
        info!(path = %store.path().display(), auth = %settings.auth_base, books = %settings.books_base, "settings loaded");
        let api = Arc::new(ApiClient::new(&settings.auth_base, &settings.books_base));
        Self {
            store,
            settings,
            api,
            session: Session::default(),
            auth_health: Indicator::Gray,
            books_health: Indicator::Gray,
            out,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    pub async fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Config { auth, books } => self.config(auth, books)?,
            Command::Health => self.health().await?,
            Command::Register {
                email,
                username,
                password,
            } => {
                let api = self.api.clone();
                let current = self.session.clone();
                let outcome = offload(move || api.register(&current, &email, &username, &password))
                    .await?
                    .context("register failed")?;
                self.session = outcome.session;
                self.print_json(&outcome.body)?;
                self.status()?;
            }
            Command::Login { identifier, password } => {
                let api = self.api.clone();
                let current = self.session.clone();
                let outcome = offload(move || api.login(&current, &identifier, &password))
                    .await?
                    .context("login failed")?;
                self.session = outcome.session;
                self.print_json(&outcome.body)?;
                self.status()?;
            }
            Command::Refresh => {
                let api = self.api.clone();
                let current = self.session.clone();
                let outcome = offload(move || api.refresh(&current))
                    .await?
                    .context("refresh failed")?;
                self.session = outcome.session;
                self.status()?;
            }
            Command::Profile => {
                let api = self.api.clone();
                let current = self.session.clone();
                let profile = offload(move || api.profile(&current))
                    .await?
                    .context("profile failed")?;
                self.print_json(&profile)?;
            }
            Command::Books { filter } => self.books(filter.into()).await?,
            Command::Status => self.status()?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn config(&mut self, auth: Option<String>, books: Option<String>) -> anyhow::Result<()> {
        if auth.is_none() && books.is_none() {
            return self.show_settings();
        }
        if let Some(auth) = auth {
            self.settings.auth_base = auth;
        }
        if let Some(books) = books {
            self.settings.books_base = books;
        }
        self.store.save(&self.settings);
        Arc::make_mut(&mut self.api).set_bases(&self.settings.auth_base, &self.settings.books_base);
        info!(auth = %self.settings.auth_base, books = %self.settings.books_base, "base URLs changed");
        self.show_settings()
    }

    async fn health(&mut self) -> anyhow::Result<()> {
        self.auth_health = Indicator::Orange;
        self.books_health = Indicator::Orange;
        self.print_indicators()?;
        let auth_api = self.api.clone();
        let books_api = self.api.clone();
        let (auth, books) = tokio::join!(
            offload(move || auth_api.health_auth()),
            offload(move || books_api.health_books()),
        );
        self.auth_health = Indicator::from_health(auth?);
        self.books_health = Indicator::from_health(books?);
        self.print_indicators()
    }

    async fn books(&mut self, query: CatalogQuery) -> anyhow::Result<()> {
        let api = self.api.clone();
        let xml = offload(move || api.fetch_catalog_xml_for(&query))
            .await?
            .context("catalog fetch failed")?;
        match decode_catalog(&xml) {
            Ok(rows) => {
                write!(self.out, "{}", render_books(&rows))?;
                writeln!(self.out, "{} book(s)", rows.len())?;
                Ok(())
            }
            Err(e) => {
                writeln!(self.out, "{xml}")?;
                Err(e).context("catalog response is not valid XML")
            }
        }
    }

    fn status(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "{}", self.session.status_line())?;
        self.print_indicators()
    }

    fn show_settings(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "auth:  {}", self.settings.auth_base)?;
        writeln!(self.out, "books: {}", self.settings.books_base)?;
        Ok(())
    }

    fn print_indicators(&mut self) -> anyhow::Result<()> {
        writeln!(
            self.out,
            "auth {}  books {}",
            self.auth_health.render(),
            self.books_health.render()
        )?;
        Ok(())
    }

    fn print_json(&mut self, value: &serde_json::Value) -> anyhow::Result<()> {
        writeln!(self.out, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}
