//! Telegram bot command handlers.

use crate::render;
use coinwatch_engine::{
    AccessControl, AccountSummary, AlertService, AssetRegistry, EngineError,
    RequestAccessOutcome, RequestCoinOutcome,
};
use coinwatch_feeds::PriceSource;
use std::sync::Arc;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and show your access")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Request access to the bot")]
    Request,
    #[command(description = "Approve a pending user. Usage: /approve USER_ID")]
    Approve(String),
    #[command(description = "Decline a pending user. Usage: /decline USER_ID")]
    Decline(String),
    #[command(description = "Request access to a coin. Usage: /request_coin COIN")]
    RequestCoin(String),
    #[command(description = "Approve a coin request. Usage: /approve_coin USER_ID COIN")]
    ApproveCoin(String),
    #[command(description = "Decline a coin request. Usage: /decline_coin USER_ID COIN")]
    DeclineCoin(String),
    #[command(description = "List users and pending requests")]
    ListUsers,
    #[command(description = "Register a new coin. Usage: /new_coin SYMBOL COINGECKO_ID")]
    NewCoin(String),
    #[command(description = "Set a price alert. Usage: /add COIN PRICE [above|below]")]
    Add(String),
    #[command(description = "Show your active alerts")]
    List,
    #[command(description = "Remove an alert. Usage: /remove NUMBER")]
    Remove(String),
    #[command(description = "Show coins available to you")]
    Coin,
    #[command(description = "Check current prices. Usage: /price COIN [COIN2 ...]")]
    Price(String),
}

/// Telegram front end wired to the engine services.
pub struct CoinwatchBot {
    bot: Bot,
    access: Arc<AccessControl>,
    alerts: Arc<AlertService>,
    registry: Arc<AssetRegistry>,
    source: Arc<dyn PriceSource>,
}

impl CoinwatchBot {
    pub fn new(
        bot: Bot,
        access: Arc<AccessControl>,
        alerts: Arc<AlertService>,
        registry: Arc<AssetRegistry>,
        source: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            bot,
            access,
            alerts,
            registry,
            source,
        }
    }

    /// Run the command dispatcher until the process is interrupted.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let this = Arc::clone(&self);

        let commands = Update::filter_message()
            .filter_command::<Command>()
            .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&this);
                async move { this.handle_command(bot, msg, cmd).await }
            });
        let fallback = Update::filter_message().endpoint(|bot: Bot, msg: Message| async move {
            if msg.text().is_some_and(|text| text.starts_with('/')) {
                bot.send_message(msg.chat.id, "❌ Unknown command. Use /help for available commands.")
                    .await?;
            }
            Ok::<(), TelegramError>(())
        });

        info!("telegram dispatcher started");
        Dispatcher::builder(bot, dptree::entry().branch(commands).branch(fallback))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let caller = msg.chat.id.to_string();
        let username = msg
            .chat
            .username()
            .or_else(|| msg.chat.first_name())
            .unwrap_or("unknown")
            .to_string();

        match cmd {
            Command::Start => {
                let summary = self.access.account_summary(&caller).await;
                self.reply_html(&bot, &msg, render::start_text(&summary)).await?;
            }

            Command::Help => {
                let summary = self.access.account_summary(&caller).await;
                self.reply_html(&bot, &msg, render::help_text(&summary)).await?;
            }

            Command::Request => self.handle_request(&bot, &msg, &caller, &username).await?,

            Command::Approve(args) => {
                let Some(target) = single_arg(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /approve USER_ID").await?;
                    return Ok(());
                };
                match self.access.approve_user(&caller, target).await {
                    Ok(()) => {
                        self.reply(&bot, &msg, format!("✅ Approved access for user {target}"))
                            .await?;
                        self.send_to(
                            target,
                            "🎉 <b>Your access has been approved!</b>\n\n\
                             You can now set alerts for BTC.\n\
                             Use <b>/add COIN PRICE [above|below]</b> to set a price alert.\n\
                             Use <b>/request_coin COIN</b> to request more coins.\n\
                             Use <b>/help</b> to see all available commands.",
                        )
                        .await;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply(&bot, &msg, "❌ Only the owner can approve users.").await?;
                    }
                    Err(EngineError::NoSuchRequest(_)) => {
                        self.reply(&bot, &msg, "❗ No pending request for this user.").await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::Decline(args) => {
                let Some(target) = single_arg(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /decline USER_ID").await?;
                    return Ok(());
                };
                match self.access.decline_user(&caller, target).await {
                    Ok(()) => {
                        self.reply(&bot, &msg, format!("❌ Declined access for user {target}"))
                            .await?;
                        self.send_to(target, "⚠️ Your access request has been declined.").await;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply(&bot, &msg, "❌ Only the owner can decline users.").await?;
                    }
                    Err(EngineError::NoSuchRequest(_)) => {
                        self.reply(&bot, &msg, "❗ No pending request for this user.").await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::RequestCoin(args) => {
                let Some(symbol) = single_arg(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /request_coin COIN").await?;
                    return Ok(());
                };
                self.handle_request_coin(&bot, &msg, &caller, &username, symbol)
                    .await?;
            }

            Command::ApproveCoin(args) => {
                let Some((target, symbol)) = two_args(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /approve_coin USER_ID COIN").await?;
                    return Ok(());
                };
                match self.access.approve_coin(&caller, target, symbol).await {
                    Ok(()) => {
                        let upper = symbol.to_uppercase();
                        self.reply(&bot, &msg, format!("✅ Approved {upper} for user {target}"))
                            .await?;
                        self.send_to(target, &format!("🎉 You now have access to {upper}!"))
                            .await;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply(&bot, &msg, "❌ Only the owner can approve coins.").await?;
                    }
                    Err(EngineError::UnknownAsset(_)) => {
                        self.reply(&bot, &msg, "❗ Invalid coin symbol.").await?;
                    }
                    Err(EngineError::NoSuchRequest(_)) => {
                        self.reply(&bot, &msg, "❗ No pending request for this coin and user.")
                            .await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::DeclineCoin(args) => {
                let Some((target, symbol)) = two_args(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /decline_coin USER_ID COIN").await?;
                    return Ok(());
                };
                match self.access.decline_coin(&caller, target, symbol).await {
                    Ok(()) => {
                        let upper = symbol.to_uppercase();
                        self.reply(&bot, &msg, format!("❌ Declined {upper} for user {target}"))
                            .await?;
                        self.send_to(target, &format!("⚠️ Your request for {upper} was declined."))
                            .await;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply(&bot, &msg, "❌ Only the owner can decline coins.").await?;
                    }
                    Err(EngineError::NoSuchRequest(_)) => {
                        self.reply(&bot, &msg, "❗ No pending request for this coin and user.")
                            .await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::ListUsers => match self.access.overview(&caller).await {
                Ok(overview) => {
                    self.reply_html(&bot, &msg, render::overview_text(&overview)).await?;
                }
                Err(EngineError::NotAuthorized) => {
                    self.reply(&bot, &msg, "❌ Only the owner can list users.").await?;
                }
                Err(e) => self.reply_error(&bot, &msg, &e).await?,
            },

            Command::NewCoin(args) => {
                let Some((symbol, coin_id)) = two_args(&args) else {
                    self.reply(
                        &bot,
                        &msg,
                        "❗ Usage: /new_coin SYMBOL COINGECKO_ID\nExample: /new_coin btc bitcoin",
                    )
                    .await?;
                    return Ok(());
                };
                match self.registry.register(&caller, symbol, coin_id).await {
                    Ok(()) => {
                        self.reply_html(
                            &bot,
                            &msg,
                            format!(
                                "✅ <b>Added new coin:</b>\n\n\
                                 Symbol: {}\n\
                                 CoinGecko ID: {}\n\n\
                                 Users can now set alerts for {}.",
                                symbol.to_uppercase(),
                                coin_id.to_lowercase(),
                                symbol.to_uppercase()
                            ),
                        )
                        .await?;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply(&bot, &msg, "❌ Only the owner can add new coins.").await?;
                    }
                    Err(EngineError::AlreadyExists(symbol)) => {
                        self.reply(
                            &bot,
                            &msg,
                            format!("⚠️ {} already exists in the symbol map.", symbol.to_uppercase()),
                        )
                        .await?;
                    }
                    Err(EngineError::ValidationFailed(coin_id)) => {
                        self.reply(
                            &bot,
                            &msg,
                            format!("❌ CoinGecko ID '{coin_id}' not found. Please check the ID."),
                        )
                        .await?;
                    }
                    Err(EngineError::Upstream(_)) => {
                        self.reply(&bot, &msg, "⚠️ Failed to verify coin with CoinGecko. Please try again.")
                            .await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::Add(args) => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() < 2 {
                    self.reply_html(&bot, &msg, "❗ Usage: <b>/add COIN PRICE [above|below]</b>")
                        .await?;
                    return Ok(());
                }
                match self
                    .alerts
                    .add(&caller, parts[0], parts[1], parts.get(2).copied())
                    .await
                {
                    Ok(alert) => {
                        self.reply_html(
                            &bot,
                            &msg,
                            format!(
                                "✅ <b>Alert set for {} ${} ({})</b>\n\n\
                                 You will be notified when the price condition is met.",
                                alert.symbol.to_uppercase(),
                                alert.price,
                                alert.direction
                            ),
                        )
                        .await?;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply_html(&bot, &msg, render::NOT_AUTHORIZED).await?;
                    }
                    Err(EngineError::UnknownAsset(_)) => {
                        self.reply(&bot, &msg, "❗ Unsupported coin.").await?;
                    }
                    Err(EngineError::Forbidden(symbol)) => {
                        self.reply_html(
                            &bot,
                            &msg,
                            format!(
                                "❌ No access to {}. Use <b>/request_coin {}</b> to request access.",
                                symbol.to_uppercase(),
                                symbol
                            ),
                        )
                        .await?;
                    }
                    Err(EngineError::InvalidPrice(_)) => {
                        self.reply(&bot, &msg, "❗ Invalid price.").await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::List => match self.alerts.list(&caller).await {
                Ok(alerts) if alerts.is_empty() => {
                    self.reply(&bot, &msg, "You have no active alerts.").await?;
                }
                Ok(alerts) => {
                    self.reply(&bot, &msg, render::alert_list(&alerts)).await?;
                }
                Err(EngineError::NotAuthorized) => {
                    self.reply_html(&bot, &msg, render::NOT_AUTHORIZED).await?;
                }
                Err(e) => self.reply_error(&bot, &msg, &e).await?,
            },

            Command::Remove(args) => {
                let Some(position) = single_arg(&args) else {
                    self.reply(&bot, &msg, "❗ Usage: /remove ALERT_NUMBER").await?;
                    return Ok(());
                };
                if !position.chars().all(|c| c.is_ascii_digit()) {
                    self.reply(&bot, &msg, "❗ Usage: /remove ALERT_NUMBER").await?;
                    return Ok(());
                }
                match self.alerts.remove(&caller, position).await {
                    Ok(removed) => {
                        self.reply(
                            &bot,
                            &msg,
                            format!(
                                "✅ Removed alert for {} ${} ({})",
                                removed.symbol.to_uppercase(),
                                removed.price,
                                removed.direction
                            ),
                        )
                        .await?;
                    }
                    Err(EngineError::NotAuthorized) => {
                        self.reply_html(&bot, &msg, render::NOT_AUTHORIZED).await?;
                    }
                    Err(EngineError::InvalidPosition(_)) => {
                        self.reply(&bot, &msg, "❗ Invalid alert number.").await?;
                    }
                    Err(e) => self.reply_error(&bot, &msg, &e).await?,
                }
            }

            Command::Coin => {
                let summary = self.access.account_summary(&caller).await;
                let symbols = self.registry.snapshot();
                self.reply_html(&bot, &msg, render::catalog_text(&summary, &symbols))
                    .await?;
            }

            Command::Price(args) => self.handle_price(&bot, &msg, &caller, &args).await?,
        }

        Ok(())
    }

    async fn handle_request(
        &self,
        bot: &Bot,
        msg: &Message,
        caller: &str,
        username: &str,
    ) -> Result<(), TelegramError> {
        match self.access.request_access(caller, username).await {
            Ok(RequestAccessOutcome::AlreadyApproved) => {
                self.reply(bot, msg, "✅ You already have access!").await?;
            }
            Ok(RequestAccessOutcome::AlreadyPending) => {
                self.reply(bot, msg, "⏳ Your request is already pending.").await?;
            }
            Ok(RequestAccessOutcome::Submitted { owner, pending }) => {
                self.reply(bot, msg, "✅ Your request has been sent to admin.").await?;
                self.send_to(
                    &owner,
                    &format!(
                        "🆕 <b>Access Request:</b>\n\n\
                         User: {username}\n\
                         ID: {caller}\n\
                         Pending requests: {pending}\n\
                         Use /approve {caller} or /decline {caller}"
                    ),
                )
                .await;
            }
            Err(e) => self.reply_error(bot, msg, &e).await?,
        }
        Ok(())
    }

    async fn handle_request_coin(
        &self,
        bot: &Bot,
        msg: &Message,
        caller: &str,
        username: &str,
        symbol: &str,
    ) -> Result<(), TelegramError> {
        let upper = symbol.to_uppercase();
        match self.access.request_coin(caller, username, symbol).await {
            Ok(RequestCoinOutcome::AlreadyEntitled) => {
                self.reply(bot, msg, format!("✅ You already have access to {upper}."))
                    .await?;
            }
            Ok(RequestCoinOutcome::AlreadyPending) => {
                self.reply(bot, msg, format!("⏳ Your request for {upper} is pending."))
                    .await?;
            }
            Ok(RequestCoinOutcome::Submitted { owner }) => {
                self.reply(bot, msg, format!("✅ Request for {upper} sent to admin."))
                    .await?;
                let symbol = symbol.to_lowercase();
                self.send_to(
                    &owner,
                    &format!(
                        "🆕 <b>Coin Access Request:</b>\n\n\
                         User: {username}\n\
                         ID: {caller}\n\
                         Coin: {upper}\n\
                         Use /approve_coin {caller} {symbol} or /decline_coin {caller} {symbol}"
                    ),
                )
                .await;
            }
            Err(EngineError::NotAuthorized) => {
                self.reply_html(bot, msg, render::NOT_AUTHORIZED).await?;
            }
            Err(EngineError::UnknownAsset(_)) => {
                self.reply(bot, msg, "❗ Invalid coin symbol.").await?;
            }
            Err(e) => self.reply_error(bot, msg, &e).await?,
        }
        Ok(())
    }

    async fn handle_price(
        &self,
        bot: &Bot,
        msg: &Message,
        caller: &str,
        args: &str,
    ) -> Result<(), TelegramError> {
        let symbols: Vec<String> = args
            .split_whitespace()
            .map(|s| s.to_lowercase())
            .collect();
        if symbols.is_empty() {
            self.reply_html(bot, msg, "❗ Usage: <b>/price COIN [COIN2 ...]</b>").await?;
            return Ok(());
        }

        let summary = self.access.account_summary(caller).await;
        match &summary {
            AccountSummary::Unregistered => {
                self.reply_html(bot, msg, render::NOT_AUTHORIZED).await?;
                return Ok(());
            }
            AccountSummary::User { coins } => {
                let unauthorized: Vec<String> = symbols
                    .iter()
                    .filter(|s| !coins.iter().any(|c| c.as_str() == s.as_str()))
                    .map(|s| s.to_uppercase())
                    .collect();
                if !unauthorized.is_empty() {
                    self.reply_html(
                        bot,
                        msg,
                        format!(
                            "❌ No access to: {}\nUse <b>/request_coin COIN</b> to request access.",
                            unauthorized.join(", ")
                        ),
                    )
                    .await?;
                    return Ok(());
                }
            }
            AccountSummary::Owner => {}
        }

        let unknown: Vec<&str> = symbols
            .iter()
            .filter(|s| !self.registry.contains(s))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            self.reply(bot, msg, format!("❗ Unknown coin(s): {}", unknown.join(", ")))
                .await?;
            return Ok(());
        }

        let ids: Vec<String> = symbols
            .iter()
            .filter_map(|s| self.registry.resolve(s).map(|id| id.to_string()))
            .collect();

        // One retry on timeout, then give up until the user asks again.
        let quotes = match self.source.lookup(&ids).await {
            Ok(quotes) => quotes,
            Err(e) if e.is_timeout() => match self.source.lookup(&ids).await {
                Ok(quotes) => quotes,
                Err(e) => {
                    warn!(error = %e, "price lookup failed");
                    self.reply(bot, msg, "⏱️ Request timed out. Try again in a few seconds.")
                        .await?;
                    return Ok(());
                }
            },
            Err(e) => {
                warn!(error = %e, "price lookup failed");
                self.reply(bot, msg, "⚠️ Failed to fetch prices due to a network error.")
                    .await?;
                return Ok(());
            }
        };

        let lines: Vec<String> = symbols
            .iter()
            .zip(&ids)
            .map(|(symbol, id)| match quotes.get(id) {
                Some(&usd) => {
                    format!("💰 {}: {}", symbol.to_uppercase(), render::format_price(usd))
                }
                None => format!("⚠️ {}: Price not found. Try again later.", symbol.to_uppercase()),
            })
            .collect();
        self.reply(bot, msg, lines.join("\n")).await?;
        Ok(())
    }

    async fn reply(
        &self,
        bot: &Bot,
        msg: &Message,
        text: impl Into<String>,
    ) -> Result<(), TelegramError> {
        bot.send_message(msg.chat.id, text.into()).await?;
        Ok(())
    }

    async fn reply_html(
        &self,
        bot: &Bot,
        msg: &Message,
        text: impl Into<String>,
    ) -> Result<(), TelegramError> {
        bot.send_message(msg.chat.id, text.into())
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    /// Generic fallback for errors a handler has no special wording for.
    async fn reply_error(
        &self,
        bot: &Bot,
        msg: &Message,
        error: &EngineError,
    ) -> Result<(), TelegramError> {
        warn!(error = %error, "command failed");
        let text = match error {
            EngineError::Upstream(_) => "⚠️ Failed to reach the price source. Please try again.",
            EngineError::Store(_) => "⚠️ Could not save your change. Please try again.",
            _ => "⚠️ Something went wrong. Please try again.",
        };
        self.reply(bot, msg, text).await
    }

    /// Side-channel notification to a user other than the caller.
    /// Delivery failures are logged and swallowed, never bounced back.
    async fn send_to(&self, user_id: &str, text: &str) {
        let chat_id = ChatId(user_id.parse().unwrap_or(0));
        if let Err(e) = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await {
            warn!(user = user_id, error = %e, "failed to notify user");
        }
    }
}

fn single_arg(args: &str) -> Option<&str> {
    let mut parts = args.split_whitespace();
    let first = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(first)
}

fn two_args(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_arg_rejects_extra_tokens() {
        assert_eq!(single_arg(" 42 "), Some("42"));
        assert_eq!(single_arg(""), None);
        assert_eq!(single_arg("42 extra"), None);
    }

    #[test]
    fn test_two_args_split() {
        assert_eq!(two_args("42 btc"), Some(("42", "btc")));
        assert_eq!(two_args("42"), None);
        assert_eq!(two_args("42 btc extra"), None);
    }
}
