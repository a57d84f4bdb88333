//! Emoji used by the installer UI, with plain fallbacks for terminals that
//! cannot render them.

use console::Emoji;

// Message levels
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");

// Run summary
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static RETRY: Emoji<'_, '_> = Emoji("🔄 ", "[RETRY]");
