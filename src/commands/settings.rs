use crate::settings::{ReplyMode, SettingsPatch};
use crate::store::SettingsStore;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ReplyModeChoice {
    #[name = "reply"]
    Reply,
    #[name = "dm"]
    Dm,
    #[name = "channel"]
    Channel,
}

impl From<ReplyModeChoice> for ReplyMode {
    fn from(choice: ReplyModeChoice) -> Self {
        match choice {
            ReplyModeChoice::Reply => ReplyMode::Reply,
            ReplyModeChoice::Dm => ReplyMode::Dm,
            ReplyModeChoice::Channel => ReplyMode::Channel,
        }
    }
}

/// Manage grammar correction settings
#[poise::command(
    slash_command,
    rename = "butler-settings",
    subcommands("show", "set", "ignore_channel", "ignore_user"),
    required_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn settings(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current settings for this server
#[poise::command(slash_command, ephemeral)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let settings = ctx.data().db.get_settings(&guild_id.to_string()).await?;

    let embed = serenity::CreateEmbed::new()
        .title("🎩 Grammar Settings")
        .field("Enabled", yes_no(settings.enabled), true)
        .field("Reply mode", format!("`{}`", settings.reply_mode), true)
        .field(
            "Threshold",
            format!("`{:.2}`", settings.correction_threshold),
            true,
        )
        .field(
            "Ignored channels",
            mention_list(&settings.ignored_channels, "<#", ">"),
            false,
        )
        .field(
            "Ignored users",
            mention_list(&settings.ignored_users, "<@", ">"),
            false,
        )
        .color(0x5865F2);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Change one or more settings
#[poise::command(slash_command)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Correct messages in this server"] enabled: Option<bool>,
    #[description = "Confidence threshold (advisory)"]
    #[min = 0.0]
    #[max = 1.0]
    threshold: Option<f64>,
    #[description = "How corrections are delivered"] reply_mode: Option<ReplyModeChoice>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;

    let patch = SettingsPatch {
        enabled,
        correction_threshold: threshold,
        reply_mode: reply_mode.map(ReplyMode::from),
        ..Default::default()
    };
    if patch.is_empty() {
        ctx.say("❌ Please specify at least one setting to change.").await?;
        return Ok(());
    }

    let confirmations = describe_patch(&patch);
    ctx.data()
        .db
        .upsert_settings(&guild_id.to_string(), patch)
        .await?;

    ctx.say(format!("✅ Updated settings: {}", confirmations.join(", ")))
        .await?;
    Ok(())
}

/// Toggle whether a channel is ignored
#[poise::command(slash_command, rename = "ignore-channel")]
pub async fn ignore_channel(
    ctx: Context<'_>,
    #[description = "Channel to toggle"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.to_string();
    let channel_id = channel.id();

    let mut current = ctx.data().db.get_settings(&guild_id).await?;
    let ignored = toggle(&mut current.ignored_channels, channel_id.to_string());
    ctx.data()
        .db
        .upsert_settings(
            &guild_id,
            SettingsPatch {
                ignored_channels: Some(current.ignored_channels),
                ..Default::default()
            },
        )
        .await?;

    let verb = if ignored { "now ignored" } else { "no longer ignored" };
    ctx.say(format!("✅ <#{}> is {}.", channel_id, verb)).await?;
    Ok(())
}

/// Toggle whether a member is ignored
#[poise::command(slash_command, rename = "ignore-user")]
pub async fn ignore_user(
    ctx: Context<'_>,
    #[description = "Member to toggle"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.to_string();

    let mut current = ctx.data().db.get_settings(&guild_id).await?;
    let ignored = toggle(&mut current.ignored_users, user.id.to_string());
    ctx.data()
        .db
        .upsert_settings(
            &guild_id,
            SettingsPatch {
                ignored_users: Some(current.ignored_users),
                ..Default::default()
            },
        )
        .await?;

    let verb = if ignored { "now ignored" } else { "no longer ignored" };
    ctx.say(format!("✅ <@{}> is {}.", user.id, verb)).await?;
    Ok(())
}

/// Flip membership of `id`; returns whether it is now present.
fn toggle(set: &mut BTreeSet<String>, id: String) -> bool {
    if set.remove(&id) {
        false
    } else {
        set.insert(id);
        true
    }
}

fn describe_patch(patch: &SettingsPatch) -> Vec<String> {
    let mut confirmations = Vec::new();
    if let Some(enabled) = patch.enabled {
        confirmations.push(format!("enabled **{}**", yes_no(enabled)));
    }
    if let Some(threshold) = patch.correction_threshold {
        confirmations.push(format!("threshold **{:.2}**", threshold.clamp(0.0, 1.0)));
    }
    if let Some(mode) = patch.reply_mode {
        confirmations.push(format!("reply mode **{}**", mode));
    }
    confirmations
}

fn mention_list(ids: &BTreeSet<String>, open: &str, close: &str) -> String {
    if ids.is_empty() {
        return "None".to_string();
    }
    ids.iter()
        .map(|id| format!("{}{}{}", open, id, close))
        .collect::<Vec<_>>()
        .join(" ")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
