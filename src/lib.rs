//! # lifelog-export
//!
//! A CLI tool that exports [Limitless](https://limitless.ai) lifelogs to local Markdown files.
//!
//! ## What it does
//!
//! Every lifelog is fetched from the Limitless API in chronological order and its
//! Markdown body is written verbatim to `export/YYYY-MM-DD-HH-MM-SS.md`. The name
//! comes from the lifelog's `startTime` converted to `America/Chicago`, whatever
//! offset the API reported it in.
//!
//! Lifelogs without a usable start time are still exported, named after the
//! current time with their position in the run appended (`...-SS-7.md`).
//!
//! ## Re-running
//!
//! There is no incremental state. Each run fetches everything again and overwrites
//! files of the same name. Two lifelogs starting in the same second end up in one
//! file, the later one winning.
//!
//! ## Usage
//!
//! ```sh
//! # LIMITLESS_API_KEY may also live in ./.env
//! export LIMITLESS_API_KEY=...
//! lifelog-export
//!
//! # Another directory and timezone, newest first, only the last 20
//! lifelog-export ~/notes/lifelogs --timezone Europe/Berlin --direction desc --limit 20
//! ```
//!
//! Preferences can be persisted in `~/.config/lifelog-export/config.toml`.
pub mod client;
pub mod exporter;
pub mod lifelog;
pub mod utils;
