//! Status lines

use super::context::UiContext;
use console::style;

pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(message).ok();
    } else {
        eprintln!("{} {}", style("[OK]").green(), message);
    }
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        eprintln!("{} {} ({})", style("[OK]").green(), message, detail);
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::info(message).ok();
    } else {
        eprintln!("{} {}", style("[INFO]").cyan(), message);
    }
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.is_interactive() {
        cliclack::log::warning(format!("{}\n{}", message, style(hint).dim())).ok();
    } else {
        eprintln!("{} {}", style("[WARN]").yellow(), message);
        eprintln!("       {}", hint);
    }
}
