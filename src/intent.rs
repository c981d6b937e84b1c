use regex_lite::Regex;

/// Item bought when a buy request names nothing recognizable.
pub const DEFAULT_BUY_ITEM: &str = "chair";

/// What the bot decided to do, classified from one completion response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Say the text out loud; the default when nothing else matches.
    Say { text: String },
    /// Walk somewhere; `None` means the handler's fixed default spot.
    Move { to: Option<(i64, i64)> },
    Buy { item: String },
    Place { x: i64, y: i64 },
    Trade { item: String },
    Mission { text: String },
    Interact,
    Emote { emotion: String },
}

/// Classify a completion response into exactly one intent.
///
/// Rules run in fixed priority order, first match wins. A rule whose
/// parameter extraction fails falls through to the next rule, and the final
/// rule always matches, so classification is total.
pub fn classify(text: &str) -> Intent {
    match_buy(text)
        .or_else(|| match_place(text))
        .or_else(|| match_trade(text))
        .or_else(|| match_mission(text))
        .or_else(|| match_interact(text))
        .or_else(|| match_move(text))
        .or_else(|| match_emote(text))
        .unwrap_or_else(|| Intent::Say {
            text: text.to_string(),
        })
}

fn has_word(text: &str, word: &str) -> bool {
    if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", word)) {
        re.is_match(text)
    } else {
        false
    }
}

fn match_buy(text: &str) -> Option<Intent> {
    if !has_word(text, "buy") {
        return None;
    }
    // The word alone is enough; a missing item name buys the default.
    let item = Regex::new(r"(?i)\bbuy\s+(\w+)")
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_BUY_ITEM.to_string());
    Some(Intent::Buy { item })
}

fn match_place(text: &str) -> Option<Intent> {
    let re = Regex::new(r"(?i)\bplace\s+\w+\s+at\s+(-?\d+)\s+(-?\d+)").ok()?;
    let caps = re.captures(text)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Intent::Place { x, y })
}

fn match_trade(text: &str) -> Option<Intent> {
    let re = Regex::new(r"(?i)\btrade\s+(\w+)").ok()?;
    let caps = re.captures(text)?;
    Some(Intent::Trade {
        item: caps.get(1)?.as_str().to_string(),
    })
}

fn match_mission(text: &str) -> Option<Intent> {
    let re = Regex::new(r"(?i)mission:").ok()?;
    let marker = re.find(text)?;
    let tail = text[marker.end()..].trim();
    if tail.is_empty() {
        return None;
    }
    Some(Intent::Mission {
        text: tail.to_string(),
    })
}

fn match_interact(text: &str) -> Option<Intent> {
    has_word(text, "interact").then_some(Intent::Interact)
}

fn match_move(text: &str) -> Option<Intent> {
    let re = Regex::new(r"(?i)\bmove\s+to\s+(-?\d+)\s+(-?\d+)").ok()?;
    let caps = re.captures(text)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Intent::Move { to: Some((x, y)) })
}

fn match_emote(text: &str) -> Option<Intent> {
    let re = Regex::new(r"\*([^*]+)\*").ok()?;
    let caps = re.captures(text)?;
    let emotion = caps.get(1)?.as_str().trim();
    if emotion.is_empty() {
        return None;
    }
    Some(Intent::Emote {
        emotion: emotion.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_extracts_the_following_word() {
        assert_eq!(
            classify("buy sword"),
            Intent::Buy {
                item: "sword".to_string()
            }
        );
        assert_eq!(
            classify("I should buy a lamp, honestly"),
            Intent::Buy {
                item: "a".to_string()
            }
        );
    }

    #[test]
    fn buy_without_an_item_buys_the_default() {
        assert_eq!(
            classify("I really want to buy"),
            Intent::Buy {
                item: DEFAULT_BUY_ITEM.to_string()
            }
        );
        assert_eq!(
            classify("buy, then decide"),
            Intent::Buy {
                item: DEFAULT_BUY_ITEM.to_string()
            }
        );
    }

    #[test]
    fn word_boundaries_guard_the_keywords() {
        assert_eq!(
            classify("buyer beware"),
            Intent::Say {
                text: "buyer beware".to_string()
            }
        );
        assert_eq!(
            classify("he trades often"),
            Intent::Say {
                text: "he trades often".to_string()
            }
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            classify("BUY Sword"),
            Intent::Buy {
                item: "Sword".to_string()
            }
        );
        assert_eq!(
            classify("Mission: scout the lobby"),
            Intent::Mission {
                text: "scout the lobby".to_string()
            }
        );
    }

    #[test]
    fn place_needs_the_full_pattern() {
        assert_eq!(classify("place lamp at 3 4"), Intent::Place { x: 3, y: 4 });
        // Word present, coordinates missing: falls through to the default.
        assert_eq!(
            classify("place it over there"),
            Intent::Say {
                text: "place it over there".to_string()
            }
        );
    }

    #[test]
    fn trade_needs_a_following_word() {
        assert_eq!(
            classify("let's trade swords"),
            Intent::Trade {
                item: "swords".to_string()
            }
        );
        assert_eq!(
            classify("I never trade"),
            Intent::Say {
                text: "I never trade".to_string()
            }
        );
    }

    #[test]
    fn mission_takes_the_trimmed_tail() {
        assert_eq!(
            classify("new orders. mission:  patrol sector 7  "),
            Intent::Mission {
                text: "patrol sector 7".to_string()
            }
        );
    }

    #[test]
    fn empty_mission_falls_through() {
        assert_eq!(
            classify("mission:   "),
            Intent::Say {
                text: "mission:   ".to_string()
            }
        );
    }

    #[test]
    fn interact_is_a_bare_keyword() {
        assert_eq!(classify("how do we interact?"), Intent::Interact);
    }

    #[test]
    fn move_requires_integer_coordinates() {
        assert_eq!(
            classify("move to 10 12"),
            Intent::Move { to: Some((10, 12)) }
        );
        assert_eq!(
            classify("move to abc def"),
            Intent::Say {
                text: "move to abc def".to_string()
            }
        );
    }

    #[test]
    fn emote_captures_between_asterisks() {
        assert_eq!(
            classify("*happy*"),
            Intent::Emote {
                emotion: "happy".to_string()
            }
        );
        assert_eq!(
            classify("well *so very pleased* indeed"),
            Intent::Emote {
                emotion: "so very pleased".to_string()
            }
        );
    }

    #[test]
    fn blank_emote_falls_through() {
        assert_eq!(
            classify("* * stars"),
            Intent::Say {
                text: "* * stars".to_string()
            }
        );
    }

    #[test]
    fn everything_else_is_said_verbatim() {
        assert_eq!(
            classify("lovely weather today"),
            Intent::Say {
                text: "lovely weather today".to_string()
            }
        );
    }

    #[test]
    fn earlier_rules_beat_later_ones() {
        // buy over place
        assert_eq!(
            classify("buy lamp and place lamp at 3 4"),
            Intent::Buy {
                item: "lamp".to_string()
            }
        );
        // place over trade
        assert_eq!(
            classify("place trophy at 3 4 then trade trophy"),
            Intent::Place { x: 3, y: 4 }
        );
        // trade over mission
        assert_eq!(
            classify("trade maps. mission: chart the maze"),
            Intent::Trade {
                item: "maps".to_string()
            }
        );
        // mission over interact
        assert_eq!(
            classify("mission: interact with guests"),
            Intent::Mission {
                text: "interact with guests".to_string()
            }
        );
        // interact over move
        assert_eq!(classify("interact then move to 3 4"), Intent::Interact);
        // move over emote
        assert_eq!(
            classify("move to 5 6 *excited*"),
            Intent::Move { to: Some((5, 6)) }
        );
    }

    #[test]
    fn failed_extraction_reaches_a_later_rule() {
        // "place" fails its pattern, "trade" still gets its chance.
        assert_eq!(
            classify("place it down or trade gems"),
            Intent::Trade {
                item: "gems".to_string()
            }
        );
    }
}
