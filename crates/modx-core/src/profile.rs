//! Deterministic display profile derived from an account address.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

const NAMES: [&str; 25] = [
    "NeonCypher",
    "QuantumRider",
    "CyberNinja",
    "DataMancer",
    "VoidHacker",
    "NeoReaper",
    "PixelPhantom",
    "CryptoSamurai",
    "DigitalWarrior",
    "ByteAssassin",
    "GlitchMaster",
    "CodeBreaker",
    "TechnoShaman",
    "CyberPunk",
    "DataGhost",
    "NeonWalker",
    "QuantumHunter",
    "VirtualRogue",
    "CyberSiren",
    "DataDruid",
    "PixelPirate",
    "TechVanguard",
    "NeoMystic",
    "CryptoNomad",
    "DigitalSage",
];

const AVATARS: [&str; 20] = [
    "🤖", "👾", "🎭", "⚡", "🔮", "💎", "🌟", "🚀", "⭐", "💫", "🌈", "🎯", "🔥", "💥", "⚔️", "🛡️",
    "👑", "🎪", "🎨", "🎵",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: Address,
    pub username: String,
    pub avatar: String,
    /// `2024-MM-DD`
    pub join_date: String,
}

/// Same address, same profile. Uses the first four address bytes.
pub fn generate_profile(address: Address) -> UserProfile {
    let seed = address.as_slice();
    let day = seed[2] % 30 + 1;
    let month = seed[3] % 12 + 1;

    UserProfile {
        address,
        username: NAMES[seed[0] as usize % NAMES.len()].to_string(),
        avatar: AVATARS[seed[1] as usize % AVATARS.len()].to_string(),
        join_date: format!("2024-{:02}-{:02}", month, day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_profile_from_leading_bytes() {
        // 0x1b = 27 -> 2, 0x05 -> 5, 0x3c = 60 -> day 1, 0x0b = 11 -> month 12
        let profile = generate_profile(address!("1b053c0b00000000000000000000000000000001"));
        assert_eq!(profile.username, "CyberNinja");
        assert_eq!(profile.avatar, "💎");
        assert_eq!(profile.join_date, "2024-12-01");
    }

    #[test]
    fn test_profile_is_deterministic() {
        let account = Address::repeat_byte(0x42);
        assert_eq!(generate_profile(account), generate_profile(account));
    }
}
