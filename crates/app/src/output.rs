//! Plain-text rendering for terminal output.

use engine::{
    Category, CategoryScope, GroupDetail, GroupMember, GroupOverview, Transaction, User, Wallet,
    WalletOwner,
};

pub fn lines<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return String::from("(none)");
    }
    items.iter().map(render).collect::<Vec<_>>().join("\n")
}

pub fn wallet_line(wallet: &Wallet) -> String {
    let owner = match wallet.owner {
        WalletOwner::Personal(_) => "personal",
        WalletOwner::Group(_) => "group",
    };
    format!(
        "{}  {:<24} {:>14} {}  [{owner}]",
        wallet.id,
        wallet.name,
        wallet.balance.to_string(),
        wallet.currency
    )
}

pub fn category_line(category: &Category) -> String {
    let scope = match category.scope {
        CategoryScope::Global => "global",
        CategoryScope::User(_) => "private",
        CategoryScope::Group(_) => "group",
    };
    format!(
        "{}  {:<24} {:<8} [{scope}]",
        category.id,
        category.name,
        category.polarity.as_str()
    )
}

pub fn user_line(user: &User) -> String {
    format!("{}  {:<24} {}", user.id, user.username, user.email)
}

pub fn member_line(member: &GroupMember) -> String {
    format!("{:<24} {}", member.username, member.role.as_str())
}

pub fn group_line(overview: &GroupOverview) -> String {
    format!(
        "{}  {:<24} {:>3} members  {:>14} {}",
        overview.group.id,
        overview.group.name,
        overview.member_count,
        overview.wallet.balance.to_string(),
        overview.wallet.currency
    )
}

pub fn group_detail(detail: &GroupDetail) -> String {
    let mut out = format!("{} ({})", detail.group.name, detail.group.id);
    if let Some(description) = &detail.group.description {
        out.push_str(&format!("\n{description}"));
    }
    out.push('\n');
    out.push_str(&wallet_line(&detail.wallet));
    out.push('\n');
    out.push_str(&lines(&detail.members, member_line));
    out
}

pub fn transaction_line(tx: &Transaction) -> String {
    format!(
        "{}  {}  {:>14}  {:<16} {}",
        tx.id,
        tx.occurred_at.format("%Y-%m-%d"),
        tx.amount.to_string(),
        tx.category.name,
        tx.title
    )
}
