use grammar_butler::commands::{history, settings, status};
use grammar_butler::correction::CorrectionEngine;
use grammar_butler::db::Database;
use grammar_butler::event::MessageEvent;
use grammar_butler::http::{self, AppState};
use grammar_butler::interaction::InteractionResponder;
use grammar_butler::llm::LlmClient;
use grammar_butler::pipeline::{Outcome, Relay};
use grammar_butler::reply::DiscordReplySink;
use grammar_butler::{config::Config, Data};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();
    debug!("Loaded configuration: {:?}", config);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![status::status(), settings::settings(), history::history()],
            event_handler: |_ctx, event, _framework, data| {
                Box::pin(async move {
                    if let serenity::FullEvent::Message { new_message } = event {
                        let message = MessageEvent::from(new_message);
                        match data.relay.handle(&message).await {
                            Ok(Outcome::Undelivered(reason)) => {
                                warn!("Correction for {} not delivered: {}", message.id, reason)
                            }
                            Ok(outcome) => debug!("Message {} -> {:?}", message.id, outcome),
                            Err(e) => error!("Failed to process message {}: {}", message.id, e),
                        }
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                match config.dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        info!("Registered commands in guild {}", guild_id);
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                    }
                }

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                let db = Database::new(&config)?;
                db.execute_init()?;

                let llm_client = Arc::new(LlmClient::new(&config)?);
                let store = Arc::new(db.clone());
                let engine =
                    CorrectionEngine::new(llm_client, store.clone(), config.persona_prompt.clone());
                let replies = Arc::new(DiscordReplySink::new(ctx.http.clone()));
                let relay = Arc::new(Relay::new(store.clone(), store.clone(), engine, replies));

                if let Some(addr) = config.http_listen_addr.clone() {
                    let state = AppState {
                        relay: relay.clone(),
                        responder: Arc::new(InteractionResponder::new(
                            store.clone(),
                            config.stats_bounds(),
                        )),
                        corrections: store.clone(),
                        bounds: config.stats_bounds(),
                    };
                    tokio::spawn(async move {
                        if let Err(e) = http::serve(&addr, state).await {
                            error!("HTTP listener stopped: {}", e);
                        }
                    });
                }

                Ok(Data { config, db, relay })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
