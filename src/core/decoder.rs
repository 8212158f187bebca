use image::{DynamicImage, GenericImageView, RgbaImage};
use log::{debug, warn};
use std::borrow::Cow;
use crate::formats::header::{
    matches_signature, read_length, LENGTH_FIELD_BITS, OPAQUE_ALPHA, SIGNATURE_BITS,
};

/// State of the alpha-LSB extraction. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePhase {
    ConfirmingSignature,
    ReadingLength,
    ReadingPayload,
    Done,
}

/// Result of scanning one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Signature and length confirmed, `param_len` bits collected and packed.
    Payload(Vec<u8>),
    /// The first signature window did not match, or the image ran out first.
    SignatureNotFound,
    /// The declared length needs more bits than the image has left.
    TruncatedPayload,
}

impl ScanOutcome {
    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            ScanOutcome::Payload(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Bit-at-a-time state machine. Knows how many bits the image can still
/// provide so that an oversized length field is rejected up front.
#[derive(Debug)]
pub struct BitstreamExtractor {
    phase: SignaturePhase,
    // header bits only; the payload is packed as it arrives
    bits: Vec<u8>,
    payload: Vec<u8>,
    current_byte: u8,
    payload_bits: usize,
    param_len: usize,
    remaining: usize,
    sig_confirmed: bool,
    outcome: Option<ScanOutcome>,
}

impl BitstreamExtractor {
    pub fn new(available_bits: usize) -> Self {
        Self {
            phase: SignaturePhase::ConfirmingSignature,
            bits: Vec::with_capacity(SIGNATURE_BITS),
            payload: Vec::new(),
            current_byte: 0,
            payload_bits: 0,
            param_len: 0,
            remaining: available_bits,
            sig_confirmed: false,
            outcome: None,
        }
    }

    pub fn phase(&self) -> SignaturePhase {
        self.phase
    }

    pub fn signature_confirmed(&self) -> bool {
        self.sig_confirmed
    }

    /// Declared payload length in bits, zero until the length field is read.
    pub fn param_len(&self) -> usize {
        self.param_len
    }

    pub fn push_bit(&mut self, bit: u8) -> SignaturePhase {
        if self.phase == SignaturePhase::Done {
            return self.phase;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.phase == SignaturePhase::ReadingPayload {
            self.current_byte = (self.current_byte << 1) | (bit & 1);
            self.payload_bits += 1;
            if self.payload_bits % 8 == 0 {
                self.payload.push(self.current_byte);
                self.current_byte = 0;
            }
            if self.payload_bits == self.param_len {
                // a trailing partial byte stays in current_byte and is dropped
                let payload = std::mem::take(&mut self.payload);
                self.finish_with(ScanOutcome::Payload(payload));
            }
            return self.phase;
        }

        self.bits.push(bit & 1);

        match self.phase {
            SignaturePhase::ConfirmingSignature if self.bits.len() == SIGNATURE_BITS => {
                if matches_signature(&self.bits) {
                    debug!("stealth signature confirmed");
                    self.sig_confirmed = true;
                    self.bits.clear();
                    self.phase = SignaturePhase::ReadingLength;
                } else {
                    self.finish_with(ScanOutcome::SignatureNotFound);
                }
            }
            SignaturePhase::ReadingLength if self.bits.len() == LENGTH_FIELD_BITS => {
                self.param_len = read_length(&self.bits) as usize;
                self.bits.clear();
                debug!("stealth payload declares {} bits, {} available", self.param_len, self.remaining);

                if self.param_len > self.remaining {
                    self.finish_with(ScanOutcome::TruncatedPayload);
                } else if self.param_len == 0 {
                    self.finish_with(ScanOutcome::Payload(Vec::new()));
                } else {
                    self.payload.reserve(self.param_len / 8);
                    self.phase = SignaturePhase::ReadingPayload;
                }
            }
            _ => {}
        }

        self.phase
    }

    /// Consumes the extractor. A scan that stopped before `Done` means the
    /// image ran out of pixels.
    pub fn finish(self) -> ScanOutcome {
        match self.outcome {
            Some(outcome) => outcome,
            None if self.sig_confirmed => ScanOutcome::TruncatedPayload,
            None => ScanOutcome::SignatureNotFound,
        }
    }

    fn finish_with(&mut self, outcome: ScanOutcome) {
        self.bits = Vec::new();
        self.payload = Vec::new();
        self.outcome = Some(outcome);
        self.phase = SignaturePhase::Done;
    }
}

/// Pixel layout resolved once per image.
enum AlphaPlane<'a> {
    Opaque,
    Rgba(Cow<'a, RgbaImage>),
}

impl<'a> AlphaPlane<'a> {
    fn of(image: &'a DynamicImage) -> Self {
        if !image.color().has_alpha() {
            return AlphaPlane::Opaque;
        }
        match image.as_rgba8() {
            Some(buf) => AlphaPlane::Rgba(Cow::Borrowed(buf)),
            None => AlphaPlane::Rgba(Cow::Owned(image.to_rgba8())),
        }
    }

    fn lsb(&self, x: u32, y: u32) -> u8 {
        match self {
            AlphaPlane::Opaque => OPAQUE_ALPHA & 1,
            AlphaPlane::Rgba(buf) => buf.get_pixel(x, y).0[3] & 1,
        }
    }
}

/// Scans the alpha LSBs column by column (x outer, y inner).
pub fn extract_payload(image: &DynamicImage) -> ScanOutcome {
    let (width, height) = image.dimensions();
    let available = width as usize * height as usize;
    if available == 0 {
        return ScanOutcome::SignatureNotFound;
    }

    let alpha = AlphaPlane::of(image);
    let mut extractor = BitstreamExtractor::new(available);

    'scan: for x in 0..width {
        for y in 0..height {
            if extractor.push_bit(alpha.lsb(x, y)) == SignaturePhase::Done {
                break 'scan;
            }
        }
    }

    let outcome = extractor.finish();
    match &outcome {
        ScanOutcome::Payload(bytes) => debug!("stealth payload of {} bytes recovered", bytes.len()),
        other => debug!("no stealth payload: {:?}", other),
    }
    outcome
}

/// Decodes the hidden parameter text, if any. Invalid UTF-8 is replaced.
///
/// `Some("")` means a valid header declaring an empty payload; `None` means
/// nothing usable was embedded.
pub fn read_stealth_parameters(image: &DynamicImage) -> Option<String> {
    let payload = extract_payload(image).into_payload()?;
    let text = String::from_utf8_lossy(&payload);
    if let Cow::Owned(_) = text {
        warn!("stealth payload is not valid UTF-8, invalid sequences replaced");
    }
    Some(text.into_owned())
}
