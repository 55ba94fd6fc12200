// Library root
// -----------
// The binary (`main.rs`) resolves a `RunConfig`, builds an `ApiClient` and
// hands both to `steps::run`.
//
// Module responsibilities:
// - `config`: CLI flags, environment fallback and the immutable run config.
// - `api`: blocking HTTP calls against the mockup API and their errors.
// - `steps`: upload, render and listing steps, run top to bottom.
// - `bundle`: the per-run transcript and the file writer for it.
//
// `steps` only talks to the API through the `MockupApi` trait, so the whole
// pipeline can be exercised without a network.
pub mod api;
pub mod bundle;
pub mod config;
pub mod steps;
