use aes_kw::{KekAes128, KekAes192, KekAes256};
use generic_array::GenericArray;

use crate::errors::Result;

/// AES Key Wrap, as defined in RFC 3394.
pub fn wrap(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; data.len() + aes_kw::IV_LEN];
    match key.len() {
        16 => KekAes128::from(*GenericArray::from_slice(key)).wrap(data, &mut out)?,
        24 => KekAes192::from(*GenericArray::from_slice(key)).wrap(data, &mut out)?,
        32 => KekAes256::from(*GenericArray::from_slice(key)).wrap(data, &mut out)?,
        size => bail!("invalid aes kw key size {}", size),
    }
    Ok(out)
}

/// AES Key Unwrap, as defined in RFC 3394.
pub fn unwrap(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    ensure!(
        data.len() > aes_kw::IV_LEN && data.len() % 8 == 0,
        "invalid wrapped key length {}",
        data.len()
    );
    let mut out = vec![0u8; data.len() - aes_kw::IV_LEN];
    match key.len() {
        16 => KekAes128::from(*GenericArray::from_slice(key)).unwrap(data, &mut out)?,
        24 => KekAes192::from(*GenericArray::from_slice(key)).unwrap(data, &mut out)?,
        32 => KekAes256::from(*GenericArray::from_slice(key)).unwrap(data, &mut out)?,
        size => bail!("invalid aes kw key size {}", size),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3394_vector_128() {
        // RFC 3394 section 4.1
        let kek = hex::decode("000102030405060708090A0B0C0D0E0F").unwrap();
        let data = hex::decode("00112233445566778899AABBCCDDEEFF").unwrap();
        let expected =
            hex::decode("1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5").unwrap();

        let wrapped = wrap(&kek, &data).unwrap();
        assert_eq!(wrapped, expected);

        let unwrapped = unwrap(&kek, &wrapped).unwrap();
        assert_eq!(unwrapped, data);
    }

    #[test]
    fn test_rfc3394_vector_256() {
        // RFC 3394 section 4.6
        let kek = hex::decode(
            "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        )
        .unwrap();
        let data = hex::decode("00112233445566778899AABBCCDDEEFF0001020304050607").unwrap();
        let expected = hex::decode(
            "28C9F404C4B810F4CBCCB35CFB87F8263F5786E2D80ED326CBC7F0E71A99F43BFB988B9B7A02DD21",
        )
        .unwrap();

        let wrapped = wrap(&kek, &data).unwrap();
        assert_eq!(wrapped, expected);

        let unwrapped = unwrap(&kek, &wrapped).unwrap();
        assert_eq!(unwrapped, data);
    }

    #[test]
    fn test_bad_key_size() {
        assert!(wrap(&[0u8; 10], &[0u8; 16]).is_err());
    }
}
