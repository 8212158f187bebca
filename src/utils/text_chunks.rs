use log::debug;
use png::{Decoder, DecodingError};

/// Keyword of the standard text chunk the generators write.
pub const PARAMETERS_KEYWORD: &str = "parameters";

/// Looks for a `parameters` tEXt, zTXt or iTXt chunk ahead of the image data.
pub fn read_parameters_chunk(bytes: &[u8]) -> Result<Option<String>, DecodingError> {
    let reader = Decoder::new(bytes).read_info()?;
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        debug!("parameters found in tEXt chunk");
        return Ok(Some(chunk.text.clone()));
    }

    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        debug!("parameters found in zTXt chunk");
        return chunk.get_text().map(Some);
    }

    if let Some(chunk) = info
        .utf8_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        debug!("parameters found in iTXt chunk");
        return chunk.get_text().map(Some);
    }

    Ok(None)
}
