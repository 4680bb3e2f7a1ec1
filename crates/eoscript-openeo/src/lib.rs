//! eoscript openEO
//!
//! HTTP client for an openEO-style API.
//!
//! - Tile services: `POST /services`, follow the `location` header, read the
//!   tile `url` from the service details, `DELETE` the location on cleanup.
//! - Graph validation: `POST /validation`.
//! - Catalog: `GET /collections` and `GET /collections/{id}`, with band
//!   metadata turned into [`BandVariable`](eoscript_config::BandVariable)s by
//!   [`extract_bands`].
//!
//! Every authenticated request carries `Authorization: <prefix><token>`,
//! where the prefix defaults to `Bearer oidc/oidc/`.

mod api;
mod bands;
mod catalog;
mod client;
mod credential;
mod error;
mod validation;

pub use api::ServiceApi;
pub use bands::{BandGroups, extract_bands, group_bands};
pub use catalog::{Collection, CollectionBand, CollectionList, Summaries};
pub use client::OpenEoClient;
pub use credential::{Credential, CredentialSource};
pub use error::ClientError;
pub use validation::{ValidationIssue, format_issues};
