//! Per-verb HTTP helpers.
//!
//! Each helper takes a URL and [`RequestOptions`]. Parameter data is
//! form-encoded into the query string (GET, DELETE) or the body (POST, PUT).
//! `Host`, `User-Agent`, Basic `Authorization` from URL credentials, and a
//! JSON `Accept` are filled in when the caller leaves them unset. The
//! response body is buffered in full and handed back as text or parsed JSON,
//! through the returned [`InFlight`] future and the optional completion
//! callback.
//!
//! ```no_run
//! use restclient::{Params, RequestOptions};
//!
//! # async fn run() -> restclient::Result<()> {
//! let options = RequestOptions::new()
//!     .data(Params::new().with("q", "rust http").with_list("tag", ["a", "b"]))
//!     .json();
//! let completion = restclient::get("https://api.example.com/search", options)?.await?;
//! println!("{} {:?}", completion.status, completion.body);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod request;
pub mod response;

pub use client::{del, get, head, post, put, InFlight, RestClient};
pub use config::{ClientConfig, HeaderDefaults, DEFAULT_USER_AGENT, JSON_ACCEPT};
pub use error::{RestError, Result};
pub use params::{ParamValue, Params};
pub use request::{OnComplete, PreparedRequest, RequestData, RequestOptions, ResponseType, Verb};
pub use response::{Body, Completion};
