//! On-chain account records for the adventure program
//!
//! Every record starts with an 8-byte little-endian discriminator. Decoding a
//! buffer tagged for a different record yields `Ok(None)` so callers can tell
//! "not this type" apart from a malformed buffer.

use super::codec::{AccountDecodeError, ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};

/// A discriminator-tagged account layout
pub trait ProgramAccount: Sized + Send + 'static {
    /// Record name used in logs
    const NAME: &'static str;

    /// Little-endian u64 at offset 0
    const DISCRIMINATOR: u64;

    /// Decode the fields that follow the discriminator
    fn decode_fields(reader: &mut ByteReader<'_>) -> Result<Self, AccountDecodeError>;

    /// Encode the fields that follow the discriminator
    fn encode_fields(&self, writer: &mut ByteWriter);

    fn discriminator_bytes() -> [u8; 8] {
        Self::DISCRIMINATOR.to_le_bytes()
    }

    /// Base58 form used in `getProgramAccounts` memcmp filters
    fn discriminator_b58() -> String {
        bs58::encode(Self::discriminator_bytes()).into_string()
    }

    /// Decode a raw account buffer
    ///
    /// Returns `Ok(None)` when the discriminator belongs to another record.
    /// Trailing bytes beyond the declared fields are ignored.
    fn deserialize(data: &[u8]) -> Result<Option<Self>, AccountDecodeError> {
        let mut reader = ByteReader::new(data);
        if reader.read_u64()? != Self::DISCRIMINATOR {
            return Ok(None);
        }
        Self::decode_fields(&mut reader).map(Some)
    }

    /// Discriminator followed by the encoded fields
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::growable();
        writer.write_u64(Self::DISCRIMINATOR);
        self.encode_fields(&mut writer);
        writer.into_bytes()
    }
}

/// Player progress through the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameDataAccount {
    pub player_position: u8,
}

impl ProgramAccount for GameDataAccount {
    const NAME: &'static str = "GameDataAccount";
    const DISCRIMINATOR: u64 = 2830422829680616787;

    fn decode_fields(reader: &mut ByteReader<'_>) -> Result<Self, AccountDecodeError> {
        Ok(Self {
            player_position: reader.read_u8()?,
        })
    }

    fn encode_fields(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.player_position);
    }
}

/// Lamport vault holding the chest reward; carries no fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChestVault;

impl ProgramAccount for ChestVault {
    const NAME: &'static str = "ChestVault";
    const DISCRIMINATOR: u64 = 4941121310321095136;

    fn decode_fields(_reader: &mut ByteReader<'_>) -> Result<Self, AccountDecodeError> {
        Ok(Self)
    }

    fn encode_fields(&self, _writer: &mut ByteWriter) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_discriminator_constants() {
        assert_eq!(
            GameDataAccount::discriminator_bytes(),
            [83, 229, 68, 63, 145, 174, 71, 39]
        );
        assert_eq!(GameDataAccount::discriminator_b58(), "F2tkBUcrpHt");

        assert_eq!(
            ChestVault::discriminator_bytes(),
            [224, 49, 205, 13, 167, 99, 146, 68]
        );
        assert_eq!(ChestVault::discriminator_b58(), "eVy8mstv7Py");
    }

    #[test]
    fn test_decode_game_data() {
        let mut data = GameDataAccount::discriminator_bytes().to_vec();
        data.push(3);
        // Allocation padding after the declared fields
        data.extend_from_slice(&[0u8; 16]);

        let account = <GameDataAccount as ProgramAccount>::deserialize(&data).unwrap();
        assert_eq!(account, Some(GameDataAccount { player_position: 3 }));
    }

    #[test]
    fn test_chest_vault_is_not_game_data() {
        let vault = ChestVault.to_bytes();
        assert_eq!(vault.len(), 8);
        assert_eq!(<GameDataAccount as ProgramAccount>::deserialize(&vault), Ok(None));
        assert_eq!(<ChestVault as ProgramAccount>::deserialize(&vault), Ok(Some(ChestVault)));
    }

    #[test]
    fn test_truncated_buffers_are_errors() {
        assert!(matches!(
            <GameDataAccount as ProgramAccount>::deserialize(&[83, 229, 68]),
            Err(AccountDecodeError::Truncated { needed: 8, .. })
        ));

        // Discriminator present, field missing
        let header = GameDataAccount::discriminator_bytes();
        assert!(matches!(
            <GameDataAccount as ProgramAccount>::deserialize(&header),
            Err(AccountDecodeError::Truncated { offset: 8, needed: 1, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_foreign_discriminator_never_matches(
            tag in any::<u64>(),
            tail in proptest::collection::vec(any::<u8>(), 1..64),
        ) {
            prop_assume!(tag != GameDataAccount::DISCRIMINATOR);
            let mut data = tag.to_le_bytes().to_vec();
            data.extend_from_slice(&tail);
            prop_assert_eq!(<GameDataAccount as ProgramAccount>::deserialize(&data), Ok(None));
        }

        #[test]
        fn prop_game_data_roundtrip(position in any::<u8>()) {
            let account = GameDataAccount { player_position: position };
            let decoded = <GameDataAccount as ProgramAccount>::deserialize(&account.to_bytes());
            prop_assert_eq!(decoded, Ok(Some(account)));
        }
    }
}
