use crate::store::{CorrectionRecord, CorrectionStore};
use crate::{Context, Error};
use chrono::DateTime;
use poise::serenity_prelude as serenity;

const PREVIEW_CHARS: usize = 80;

/// Show recent corrections for a member of this server
#[poise::command(slash_command, rename = "butler-history", guild_only, ephemeral)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
    #[description = "How many corrections to show"]
    #[min = 1]
    #[max = 10]
    limit: Option<usize>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.to_string();
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let limit = limit.unwrap_or(5).clamp(1, 10);

    let records = ctx
        .data()
        .db
        .query_by_user_in_guild(&guild_id, &user.id.to_string(), limit)
        .await?;

    ctx.say(format_history(&user.id.to_string(), &records)).await?;
    Ok(())
}

fn format_history(user_id: &str, records: &[CorrectionRecord]) -> String {
    if records.is_empty() {
        return format!("🎩 No corrections on record for <@{}>.", user_id);
    }

    let mut out = format!("🎩 **Recent corrections for <@{}>**\n", user_id);
    for record in records {
        let when = DateTime::from_timestamp_millis(record.timestamp)
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        out.push_str(&format!(
            "\n`{}` ~~{}~~\n> {}\n",
            when,
            preview(&record.original_message),
            preview(&record.corrected_message)
        ));
    }
    out
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut out: String = flat.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}
