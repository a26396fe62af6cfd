//! Positional argument vector handed to `bot.js`.
//!
//! The bot reads `process.argv` by position, so the order below is a wire
//! contract with the bundled script.

use discordum_config::{ArgumentLayout, Config};

/// Number of arguments in [`ArgumentLayout::Basic`].
pub const BASIC_ARG_COUNT: usize = 13;

/// Number of arguments in [`ArgumentLayout::Extended`].
pub const EXTENDED_ARG_COUNT: usize = 19;

/// Build the ordered argument vector for the configured layout.
///
/// Booleans render as `true`/`false`, integers in decimal, and the server
/// type in lowercase.
#[must_use]
pub fn build_arguments(config: &Config) -> Vec<String> {
    let embed = &config.embed;
    let mut args = vec![
        config.bot.token.clone(),
        config.bot.channel_id.clone(),
        config.server.name.clone(),
        config.server.ip.clone(),
        config.server.port.to_string(),
        config.server.server_type.to_string(),
        embed.online_color.clone(),
        embed.offline_color.clone(),
        embed.show_banner.to_string(),
        embed.banner_url.clone(),
        embed.show_title_image.to_string(),
        embed.title_image_url.clone(),
        config.update_interval.to_string(),
    ];

    if config.arguments.layout == ArgumentLayout::Extended {
        let notify = &config.notifications;
        args.extend([
            notify.online.enabled.to_string(),
            notify.online.role_id.clone(),
            notify.offline.enabled.to_string(),
            notify.offline.role_id.clone(),
            embed.footer.enabled.to_string(),
            embed.footer.text.clone(),
        ]);
    }

    args
}
