//! Parsed IRC lines.
//!
//! The parser is deliberately forgiving: it never fails on a non-empty line.
//! Lines are split on single spaces and interpreted by token count, which is
//! enough for the handful of verbs a bot reacts to (PING, NOTICE, MODE,
//! PRIVMSG and numerics) and degrades gracefully for everything else.

/// One inbound or outbound protocol line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// The line as received, trimmed, leading ':' intact.
    pub raw: String,
    /// Command token or three-digit numeric.
    pub verb: String,
    /// Bare nick (or server name) the line came from.
    pub reply_to: String,
    /// Nick or channel the line is addressed to.
    pub to: String,
    /// Free-text payload (trailing parameter).
    pub message: String,
    /// Command name extracted from a prefixed payload.
    pub command: String,
    /// Remaining words after the command name.
    pub arguments: Vec<String>,
    /// Addressed directly to the bot's nickname.
    pub is_whisper: bool,
}

/// Parse one line into a [`ParsedMessage`].
///
/// Returns `None` when the line is empty after trimming.
pub fn parse(input: &str) -> Option<ParsedMessage> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut msg = ParsedMessage {
        raw: input.to_string(),
        ..Default::default()
    };

    let line = input.strip_prefix(':').unwrap_or(input);
    let tokens: Vec<&str> = line.split(' ').collect();

    match tokens.as_slice() {
        [verb] => {
            msg.verb = (*verb).to_string();
            msg.message = (*verb).to_string();
        }
        [verb, payload] => {
            msg.verb = (*verb).to_string();
            msg.message = (*payload).to_string();
            msg.reply_to = (*payload).to_string();
            msg.to = (*payload).to_string();
        }
        [source, verb, target] => {
            msg.reply_to = bare_source(source).to_string();
            msg.verb = (*verb).to_string();
            msg.to = (*target).to_string();
        }
        [source, verb, target, rest @ ..] => {
            msg.reply_to = bare_source(source).to_string();
            msg.verb = (*verb).to_string();
            msg.to = (*target).to_string();
            msg.message = trailing(rest);
        }
        [] => return None,
    }

    Some(msg)
}

/// Parse a line and run command extraction in one step.
pub fn parse_with(input: &str, prefix: &str, nick: &str) -> Option<ParsedMessage> {
    let mut msg = parse(input)?;
    msg.extract_command(prefix, nick);
    Some(msg)
}

/// Encode an outbound reply line (without terminator).
pub fn encode_privmsg(to: &str, text: &str) -> String {
    format!("PRIVMSG {} :{}", to, text)
}

fn bare_source(token: &str) -> &str {
    token.split('!').next().unwrap_or(token)
}

fn trailing(rest: &[&str]) -> String {
    match rest.iter().position(|t| t.starts_with(':')) {
        Some(start) => {
            let joined = rest[start..].join(" ");
            joined
                .strip_prefix(':')
                .map(str::to_string)
                .unwrap_or(joined)
        }
        None => rest.join(" "),
    }
}

impl ParsedMessage {
    /// Build an outbound reply addressed to `to`.
    pub fn outbound(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            message: text.into(),
            ..Default::default()
        }
    }

    /// Populate `command`, `arguments` and `is_whisper` for the given prefix
    /// and bot nickname.
    ///
    /// The command is only set when the payload starts with `prefix` and is
    /// longer than one character; a bare prefix yields no command.
    pub fn extract_command(&mut self, prefix: &str, nick: &str) {
        self.is_whisper = self.to == nick;
        self.command.clear();
        self.arguments.clear();

        if prefix.is_empty() || self.message.len() <= 1 {
            return;
        }
        let Some(rest) = self.message.strip_prefix(prefix) else {
            return;
        };

        let mut words = rest.split(' ');
        let command = words.next().unwrap_or_default();
        if command.is_empty() {
            return;
        }
        self.command = command.to_string();
        self.arguments = words.map(str::to_string).collect();
    }

    /// True when a command was extracted.
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }

    /// The verb as a numeric reply code, if it is exactly three ASCII digits.
    pub fn numeric(&self) -> Option<u16> {
        if self.verb.len() == 3 && self.verb.bytes().all(|b| b.is_ascii_digit()) {
            self.verb.parse().ok()
        } else {
            None
        }
    }

    /// True when the destination is a channel.
    pub fn is_channel(&self) -> bool {
        self.to.starts_with('#')
    }

    /// Where a reply should go: the channel for channel traffic, the sender otherwise.
    pub fn reply_target(&self) -> &str {
        if self.is_channel() {
            &self.to
        } else {
            &self.reply_to
        }
    }

    /// Encode as `PRIVMSG <to> :<message>`.
    pub fn encode(&self) -> String {
        encode_privmsg(&self.to, &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line_is_none() {
        assert!(parse("").is_none());
        assert!(parse("   \r\n").is_none());
    }

    #[test]
    fn test_single_token() {
        let msg = parse("FOO").unwrap();
        assert_eq!(msg.verb, "FOO");
        assert_eq!(msg.message, "FOO");
        assert!(msg.reply_to.is_empty());
        assert!(msg.to.is_empty());
    }

    #[test]
    fn test_ping_two_tokens() {
        let msg = parse("PING mustangsally\r\n").unwrap();
        assert_eq!(msg.verb, "PING");
        assert_eq!(msg.message, "mustangsally");
        assert_eq!(msg.reply_to, "mustangsally");
        assert_eq!(msg.to, "mustangsally");
        assert_eq!(msg.raw, "PING mustangsally");
    }

    #[test]
    fn test_three_tokens_strip_user_host() {
        let msg = parse(":nick!user@host JOIN #chan").unwrap();
        assert_eq!(msg.reply_to, "nick");
        assert_eq!(msg.verb, "JOIN");
        assert_eq!(msg.to, "#chan");
        assert!(msg.message.is_empty());
    }

    #[test]
    fn test_privmsg_trailing() {
        let msg = parse(":nick!user@host PRIVMSG #chan :hello").unwrap();
        assert_eq!(msg.reply_to, "nick");
        assert_eq!(msg.verb, "PRIVMSG");
        assert_eq!(msg.to, "#chan");
        assert_eq!(msg.message, "hello");
    }

    #[test]
    fn test_privmsg_without_leading_colon() {
        let msg = parse("mustangsally!ok@ok PRIVMSG #ok :hello there friend").unwrap();
        assert_eq!(msg.verb, "PRIVMSG");
        assert_eq!(msg.message, "hello there friend");
    }

    #[test]
    fn test_trailing_marker_after_middle_params() {
        let msg = parse(":host.test 433 * mustangsally :Nickname is already in use").unwrap();
        assert_eq!(msg.verb, "433");
        assert_eq!(msg.reply_to, "host.test");
        assert_eq!(msg.to, "*");
        assert_eq!(msg.message, "Nickname is already in use");
    }

    #[test]
    fn test_no_trailing_marker_joins_rest() {
        let msg = parse(":server MODE bot +i extra").unwrap();
        assert_eq!(msg.message, "+i extra");
    }

    #[test]
    fn test_numeric_detection() {
        assert_eq!(parse(":srv 001 bot :Welcome").unwrap().numeric(), Some(1));
        assert_eq!(parse(":srv 433 * bot :in use").unwrap().numeric(), Some(433));
        assert_eq!(parse(":n!u@h PRIVMSG #c :x").unwrap().numeric(), None);
        assert_eq!(parse(":srv 4333 * x :y").unwrap().numeric(), None);
    }

    #[test]
    fn test_extract_command_with_args() {
        let mut msg = parse(":alice!a@h PRIVMSG #chan :!echo a b").unwrap();
        msg.extract_command("!", "bot");
        assert_eq!(msg.command, "echo");
        assert_eq!(msg.arguments, vec!["a", "b"]);
        assert!(!msg.is_whisper);
    }

    #[test]
    fn test_extract_bare_prefix_has_no_command() {
        let msg = parse_with(":alice!a@h PRIVMSG #chan :!", "!", "bot").unwrap();
        assert!(!msg.has_command());
        assert!(msg.arguments.is_empty());
    }

    #[test]
    fn test_extract_without_payload_has_no_command() {
        let msg = parse_with(":alice!a@h JOIN #chan", "!", "bot").unwrap();
        assert!(!msg.has_command());
    }

    #[test]
    fn test_extract_multichar_prefix() {
        let msg = parse_with(":alice!a@h PRIVMSG bot :-=karma bob", "-=", "bot").unwrap();
        assert_eq!(msg.command, "karma");
        assert_eq!(msg.arguments, vec!["bob"]);
        assert!(msg.is_whisper);
    }

    #[test]
    fn test_reextract_clears_previous() {
        let mut msg = parse_with(":alice!a@h PRIVMSG #c :!echo hi", "!", "bot").unwrap();
        msg.extract_command("?", "bot");
        assert!(!msg.has_command());
        assert!(msg.arguments.is_empty());
    }

    #[test]
    fn test_reply_target() {
        let chan = parse(":alice!a@h PRIVMSG #chan :hi").unwrap();
        assert_eq!(chan.reply_target(), "#chan");
        let direct = parse(":alice!a@h PRIVMSG bot :hi").unwrap();
        assert_eq!(direct.reply_target(), "alice");
    }

    #[test]
    fn test_encode_outbound() {
        let reply = ParsedMessage::outbound("#chan", "hello world");
        assert_eq!(reply.encode(), "PRIVMSG #chan :hello world");
    }
}
