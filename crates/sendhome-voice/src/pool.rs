//! Fixed ElevenLabs voice pool and the default name-hash assignment policy.

use sha2::{Digest, Sha256};
use sendhome_core::VoiceAssignment;

pub const MALE_VOICES: [&str; 6] = [
    "pNInz6obpgDQGcFmaJgB", // Adam
    "yoZ06aMxZJJ28mfd3POQ", // Sam
    "TxGEqnHWrfWFTfGW9XjX", // Josh
    "VR6AewLTigWG4xSOukaG", // Arnold
    "ErXwobaYiN019PkySvjV", // Antoni
    "GBv7mTt0atIp3Br8iCZE", // Thomas
];

pub const FEMALE_VOICES: [&str; 6] = [
    "21m00Tcm4TlvDq8ikWAM", // Rachel
    "EXAVITQu4vr4xnSDxMaL", // Bella
    "MF3mGyEYCl7XYWbV9V6O", // Elli
    "XrExE9yKIg1WjnnlVkGX", // Matilda
    "oWAxZDx7w5VEj9dCyTzz", // Grace
    "AZnzlk1XvdvUeBnXmlld", // Domi
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Male,
    Female,
}

/// Same name, same voice. Picks a gendered pool from the given name, then a
/// voice from a stable hash of the full name.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameHashVoicePolicy;

impl NameHashVoicePolicy {
    pub fn gender(display_name: &str) -> VoiceGender {
        let Some(given) = display_name.split_whitespace().next() else {
            return VoiceGender::Male;
        };
        match given.chars().last().map(|c| c.to_ascii_lowercase()) {
            Some('a') | Some('e') => VoiceGender::Female,
            _ if name_hash(display_name) % 2 == 0 => VoiceGender::Male,
            _ => VoiceGender::Female,
        }
    }
}

impl VoiceAssignment for NameHashVoicePolicy {
    fn assign(&self, display_name: &str) -> String {
        let pool = match Self::gender(display_name) {
            VoiceGender::Male => &MALE_VOICES,
            VoiceGender::Female => &FEMALE_VOICES,
        };
        let idx = (name_hash(display_name) % pool.len() as u64) as usize;
        pool[idx].to_string()
    }
}

fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.trim().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
