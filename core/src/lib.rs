//! # actix-cas-core
//!
//! CAS single-sign-on bridge for Actix Web applications.
//!
//! ```ignore
//! use std::sync::Arc;
//! use actix_cas_core::http::cas::{
//!     CasAuthService, CasSettings, CasUrls, InMemoryUserStore, StaticTicketValidator,
//! };
//!
//! let settings = CasSettings::new().enabled(true).autocreate(true);
//! let urls = CasUrls::new("http://localhost:8080");
//! let validator = Arc::new(StaticTicketValidator::new("https://cas.example.com"));
//! let store = Arc::new(InMemoryUserStore::new());
//! let service = CasAuthService::new(settings, urls, validator, store);
//! ```
//!
//! See [`http::cas`] for the module-by-module breakdown.

pub mod http;
