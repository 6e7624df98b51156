use crate::interaction::format_status_report;
use crate::stats;
use crate::{Context, Error};
use tracing::info;

/// Show this server's grammar correction statistics
#[poise::command(slash_command, rename = "butler-status", guild_only, ephemeral)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let bounds = ctx.data().config.stats_bounds();

    let stats = stats::guild_stats(&ctx.data().db, &guild_id.to_string(), bounds).await?;
    info!(
        "Status requested for guild {}: {} corrections",
        guild_id, stats.total_corrections
    );

    ctx.say(format_status_report(&stats, bounds.top_users)).await?;
    Ok(())
}
