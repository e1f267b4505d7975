//! Slash command parsing

/// Commands the bot understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    /// `/kb`, `/knowledge`, `/knowledgebase`
    KnowledgeBase,
    /// `/search [query]`
    Search(String),
    /// `/category [name]`
    Category(String),
    HelpKb,
    /// `/kb_add <category> <item_id> <json>`
    KbAdd(String),
}

impl Command {
    /// Parse a message text as a command. The `@botname` suffix is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim().to_string()),
            None => (rest, String::new()),
        };
        let name = head.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "cancel" => Some(Command::Cancel),
            "kb" | "knowledge" | "knowledgebase" => Some(Command::KnowledgeBase),
            "search" => Some(Command::Search(args)),
            "category" => Some(Command::Category(args)),
            "help_kb" => Some(Command::HelpKb),
            "kb_add" => Some(Command::KbAdd(args)),
            _ => None,
        }
    }

    /// Whether the command ends any running wizard
    pub fn resets_dialogue(&self) -> bool {
        matches!(self, Command::Start | Command::Cancel)
    }
}

/// Arguments of `/kb_add`
#[derive(Debug, Clone, PartialEq)]
pub struct KbAddArgs {
    pub category: String,
    pub item_id: String,
    pub document: serde_json::Value,
}

/// Split `/kb_add` arguments into category, item id and JSON document
pub fn parse_kb_add_args(args: &str) -> Result<KbAddArgs, &'static str> {
    let mut parts = args.trim().splitn(3, char::is_whitespace);
    let category = parts.next().filter(|s| !s.is_empty()).ok_or("kb-add-usage")?;
    let item_id = parts.next().filter(|s| !s.is_empty()).ok_or("kb-add-usage")?;
    let json = parts.next().map(str::trim).filter(|s| !s.is_empty()).ok_or("kb-add-usage")?;
    let document = serde_json::from_str(json).map_err(|_| "kb-add-invalid-json")?;

    Ok(KbAddArgs {
        category: category.to_string(),
        item_id: item_id.to_string(),
        document,
    })
}
