//! Reply text rendering.
//!
//! All multi-line reply bodies live here so the command handlers stay
//! readable. Replies use Telegram HTML markup.

use coinwatch_core::{Alert, SymbolMap};
use coinwatch_engine::{AccessOverview, AccountSummary};

/// Standard refusal for callers without an account.
pub const NOT_AUTHORIZED: &str =
    "❌ You are not authorized to use this bot.\nUse <b>/request</b> to ask for access.";

const ALERT_EXAMPLES: &str = "<b>Examples:</b>\n\
     <b>/add BTC 100000</b> - alert if price goes above 100000\n\
     <b>/add BTC 100000 below</b> - alert if price drops below 100000";

/// Format a USD price with precision scaled to its magnitude, so micro
/// cap quotes do not collapse to $0.00.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1000.0 {
        format!("${:.2}", price)
    } else if abs >= 1.0 {
        format!("${:.4}", price)
    } else if abs > 0.0 {
        format!("${:.8}", price)
    } else {
        "$0".to_string()
    }
}

/// Role-aware /start greeting.
pub fn start_text(summary: &AccountSummary) -> String {
    match summary {
        AccountSummary::Owner => format!(
            "👋 <b>Welcome to Coinwatch!</b>\n\n\
             Use <b>/add COIN PRICE [above|below]</b> to set a price alert.\n\n\
             {ALERT_EXAMPLES}\n\n\
             📌 <b>Owner Commands:</b>\n\
             <b>/approve USER_ID</b> - Approve user\n\
             <b>/decline USER_ID</b> - Decline user\n\
             <b>/approve_coin USER_ID COIN</b> - Approve coin\n\
             <b>/decline_coin USER_ID COIN</b> - Decline coin\n\
             <b>/list_users</b> - List all users\n\
             <b>/new_coin SYMBOL COINGECKO_ID</b> - Register a new coin\n\
             <b>/help</b> - Show all available commands"
        ),
        AccountSummary::User { coins } => {
            let coins = coins
                .iter()
                .map(|c| c.to_uppercase())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "👋 <b>Welcome to Coinwatch!</b>\n\n\
                 ✅ Your coins: {coins}\n\
                 Use <b>/add COIN PRICE [above|below]</b> to set a price alert.\n\n\
                 {ALERT_EXAMPLES}\n\
                 <b>/help</b> - Show all available commands"
            )
        }
        AccountSummary::Unregistered => "👋 Welcome to Coinwatch!\n\n\
             You are not authorized to use this bot.\n\
             Use /request to ask for access."
            .to_string(),
    }
}

/// Role-aware /help body.
pub fn help_text(summary: &AccountSummary) -> String {
    let mut text = String::from(
        "📌 <b>Basic Commands:</b>\n\
         <b>/start</b> - Start the bot\n\
         <b>/help</b> - Show this help message\n",
    );

    if matches!(summary, AccountSummary::Unregistered) {
        text.push_str(
            "\n❌ You are not authorized to use this bot.\n\
             Use <b>/request</b> to ask for access.",
        );
        return text;
    }

    text.push_str(
        "\n📌 <b>User Commands:</b>\n\
         <b>/add COIN PRICE [above|below]</b> - Set a price alert\n\
         <b>/list</b> - Show your active alerts\n\
         <b>/remove NUMBER</b> - Remove an alert\n\
         <b>/coin</b> - Show coins available to you\n\
         <b>/price COIN [COIN2 ...]</b> - Check current price(s)\n\
         <b>/request_coin COIN</b> - Request coin access\n",
    );

    if matches!(summary, AccountSummary::Owner) {
        text.push_str(
            "\n📌 <b>Owner Commands:</b>\n\
             <b>/approve USER_ID</b> - Approve user\n\
             <b>/decline USER_ID</b> - Decline user\n\
             <b>/approve_coin USER_ID COIN</b> - Approve coin\n\
             <b>/decline_coin USER_ID COIN</b> - Decline coin\n\
             <b>/list_users</b> - List all users\n\
             <b>/new_coin SYMBOL COINGECKO_ID</b> - Register a new coin\n",
        );
    }
    text
}

/// Numbered alert listing, creation order. The number is the handle
/// `/remove` takes.
pub fn alert_list(alerts: &[Alert]) -> String {
    let mut text = String::from("📋 Your alerts:\n");
    for (i, alert) in alerts.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} {} ${}\n",
            i + 1,
            alert.symbol.to_uppercase(),
            alert.direction,
            alert.price
        ));
    }
    text
}

/// Owner's /list_users overview.
pub fn overview_text(overview: &AccessOverview) -> String {
    let mut text = String::new();

    if overview.users.is_empty() {
        text.push_str("<b>No approved users.</b>\n");
    } else {
        text.push_str("<b>Approved Users:</b>\n");
        for (user_id, account) in &overview.users {
            let coins = account
                .coins
                .iter()
                .map(|c| c.to_uppercase())
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(
                "- {} (ID: {})\n  Coins: {}\n",
                account.username, user_id, coins
            ));
        }
    }

    if overview.requests.is_empty() {
        text.push_str("\n<b>No pending access requests.</b>");
    } else {
        text.push_str("\n<b>Pending Access Requests:</b>\n");
        for request in &overview.requests {
            text.push_str(&format!("- {} (ID: {})\n", request.username, request.user_id));
        }
    }

    if overview.coin_requests.is_empty() {
        text.push_str("\n<b>No pending coin requests.</b>");
    } else {
        text.push_str("\n<b>Pending Coin Requests:</b>\n");
        for request in &overview.coin_requests {
            text.push_str(&format!(
                "- {} (ID: {}) for {}\n",
                request.username,
                request.user_id,
                request.coin.to_uppercase()
            ));
        }
    }
    text
}

/// /coin view: the caller's entitlements plus the full catalog.
pub fn catalog_text(summary: &AccountSummary, symbols: &SymbolMap) -> String {
    let mut lines = Vec::new();

    match summary {
        AccountSummary::Owner => {
            lines.push("<b>📊 Owner Access:</b> You can manage all coins.".to_string());
            lines.push("\nUse /add COIN PRICE [above|below] to set an alert.".to_string());
        }
        AccountSummary::User { coins } => {
            let owned = coins
                .iter()
                .map(|c| {
                    let id = symbols
                        .resolve(c)
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "Unknown".to_string());
                    format!("• {} ({})", c.to_uppercase(), id)
                })
                .collect::<Vec<_>>()
                .join("\n");
            lines.push(format!("<b>📊 Your Coins:</b>\n{owned}"));
            lines.push("\nUse <b>/request_coin COIN</b> to request more coins.".to_string());
        }
        AccountSummary::Unregistered => {
            lines.push(NOT_AUTHORIZED.to_string());
        }
    }

    let catalog = symbols
        .iter()
        .map(|(symbol, id)| format!("• {} ({})", symbol.to_uppercase(), id))
        .collect::<Vec<_>>()
        .join("\n");
    lines.push(format!("\n<b>🌐 All Available Coins:</b>\n{catalog}"));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_core::Direction;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_price_scales_precision() {
        assert_eq!(format_price(104_250.137), "$104250.14");
        assert_eq!(format_price(3.14159), "$3.1416");
        assert_eq!(format_price(0.00001234), "$0.00001234");
        assert_eq!(format_price(0.0), "$0");
    }

    #[test]
    fn test_alert_list_is_one_based() {
        let alerts = vec![
            Alert {
                coin: "bitcoin".into(),
                symbol: "btc".into(),
                price: 100000.0,
                direction: Direction::Above,
            },
            Alert {
                coin: "ethereum".into(),
                symbol: "eth".into(),
                price: 2000.0,
                direction: Direction::Below,
            },
        ];
        let text = alert_list(&alerts);
        assert!(text.contains("1. BTC above $100000"));
        assert!(text.contains("2. ETH below $2000"));
    }

    #[test]
    fn test_help_hides_owner_section_from_users() {
        let user = help_text(&AccountSummary::User { coins: vec![] });
        assert!(user.contains("/request_coin"));
        assert!(!user.contains("Owner Commands"));

        let owner = help_text(&AccountSummary::Owner);
        assert!(owner.contains("Owner Commands"));
    }

    #[test]
    fn test_overview_lists_all_sections() {
        let overview = AccessOverview {
            users: vec![(
                "42".to_string(),
                coinwatch_core::UserAccount::seeded("alice"),
            )],
            requests: vec![],
            coin_requests: vec![],
        };
        let text = overview_text(&overview);
        assert!(text.contains("alice (ID: 42)"));
        assert!(text.contains("Coins: BTC"));
        assert!(text.contains("No pending access requests."));
        assert!(text.contains("No pending coin requests."));
    }
}
