//! Terminal UI helpers
//!
//! Uses `cliclack` for spinners and prompts in an interactive terminal and
//! falls back to plain lines in CI. Everything here writes to stderr:
//! stdout is reserved for the JSON and text the commands print.
//!
//! ```rust,ignore
//! use cmc::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Resolving github:acme/std/rulesets/ts@v1.0.0");
//! // ... resolve ...
//! spinner.stop("Resolved 2 rulesets");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
pub use prompts::confirm;
