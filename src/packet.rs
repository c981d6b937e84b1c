/// Sender id used when a chat frame names no numeric user.
pub const ANONYMOUS_SENDER: &str = "anonymous";

const SAY_MARKER: &str = "say\" \"";
const USER_ID_MARKER: &str = "user_id=";

/// A chat message lifted out of a raw world-server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundChat {
    pub sender: String,
    pub message: String,
}

/// Extract a chat message from a raw text frame.
///
/// Returns `None` for anything that is not a chat packet (no `say` marker,
/// unterminated quote). Never fails: a frame without a parseable sender id
/// is attributed to [`ANONYMOUS_SENDER`].
pub fn parse_packet(payload: &str) -> Option<InboundChat> {
    let start = payload.find(SAY_MARKER)? + SAY_MARKER.len();
    let rest = &payload[start..];
    let end = rest.find('"')?;
    Some(InboundChat {
        sender: parse_sender(payload),
        message: rest[..end].to_string(),
    })
}

fn parse_sender(payload: &str) -> String {
    let Some(pos) = payload.find(USER_ID_MARKER) else {
        return ANONYMOUS_SENDER.to_string();
    };
    let digits: String = payload[pos + USER_ID_MARKER.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        ANONYMOUS_SENDER.to_string()
    } else {
        digits
    }
}

/// Render an outbound chat frame spoken by the given bot.
pub fn encode_chat(message: &str, bot_id: i64) -> String {
    format!("say\" \"{}\" user_id={}", message, bot_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_and_sender() {
        let packet = parse_packet("say\" \"hello there\" user_id=42").expect("chat packet");
        assert_eq!(packet.sender, "42");
        assert_eq!(packet.message, "hello there");
    }

    #[test]
    fn missing_user_id_is_anonymous() {
        let packet = parse_packet("say\" \"who goes there\"").expect("chat packet");
        assert_eq!(packet.sender, ANONYMOUS_SENDER);
        assert_eq!(packet.message, "who goes there");
    }

    #[test]
    fn non_numeric_user_id_is_anonymous() {
        let packet = parse_packet("say\" \"hi\" user_id=abc").expect("chat packet");
        assert_eq!(packet.sender, ANONYMOUS_SENDER);
    }

    #[test]
    fn sender_digits_stop_at_first_non_digit() {
        let packet = parse_packet("say\" \"hi\" user_id=42;room=9").expect("chat packet");
        assert_eq!(packet.sender, "42");
    }

    #[test]
    fn frame_without_say_marker_is_not_chat() {
        assert_eq!(parse_packet("move user_id=42"), None);
        assert_eq!(parse_packet(""), None);
    }

    #[test]
    fn unterminated_message_is_not_chat() {
        assert_eq!(parse_packet("say\" \"half a message"), None);
    }

    #[test]
    fn empty_message_still_parses() {
        let packet = parse_packet("say\" \"\" user_id=7").expect("chat packet");
        assert_eq!(packet.message, "");
    }

    #[test]
    fn marker_may_sit_mid_frame() {
        let packet = parse_packet("@room 5 say\" \"good evening\" user_id=11 tail")
            .expect("chat packet");
        assert_eq!(packet.sender, "11");
        assert_eq!(packet.message, "good evening");
    }

    #[test]
    fn encodes_outbound_form() {
        assert_eq!(encode_chat("welcome in", 3), "say\" \"welcome in\" user_id=3");
    }
}
