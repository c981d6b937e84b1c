use crate::packet::ANONYMOUS_SENDER;
use crate::persona::PersonaProfile;

/// How a sender is named inside prompts and transcripts.
pub fn speaker_label(sender: &str) -> String {
    if sender == ANONYMOUS_SENDER {
        "Guest".to_string()
    } else {
        format!("Guest_{}", sender)
    }
}

/// Assemble the completion prompt for one turn.
///
/// Deterministic: identical inputs produce byte-identical output. The
/// transcript, when present, is already newline-terminated; the cue line
/// deliberately has no trailing newline so the model completes in place.
pub fn build_prompt(
    profile: &PersonaProfile,
    memory: Option<&str>,
    sender: &str,
    message: &str,
    scene: &str,
) -> String {
    let mut prompt = format!(
        "You are {}. Tone: {}. Interests: {}.",
        profile.name,
        profile.tone,
        profile.interests.join(", ")
    );
    if profile.can_emote {
        prompt.push_str(" You may show a feeling by wrapping it in asterisks.");
    }
    prompt.push('\n');
    prompt.push_str(scene);
    prompt.push('\n');
    if let Some(transcript) = memory {
        prompt.push_str(transcript);
    }
    prompt.push_str(&format!(
        "{}: {}\n{}:",
        speaker_label(sender),
        message,
        profile.name
    ));
    prompt
}

/// Append one exchange to a transcript, starting one when there is none.
pub fn extend_transcript(
    prior: Option<&str>,
    label: &str,
    message: &str,
    bot_name: &str,
    reply: &str,
) -> String {
    let mut transcript = prior.unwrap_or("").to_string();
    transcript.push_str(&format!("{}: {}\n{}: {}\n", label, message, bot_name, reply));
    transcript
}
