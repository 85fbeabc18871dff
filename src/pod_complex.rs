use bytemuck::{Pod, Zeroable};
use num_complex::Complex32;

/// POD representation of `Complex<f32>`: `[re, im]` with `repr(C)`.
///
/// This is the element layout of every BART payload: interleaved real and
/// imaginary parts, 8 bytes per element.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Zeroable, Pod)]
pub struct PodComplexF32 {
    pub re: f32,
    pub im: f32,
}

impl From<Complex32> for PodComplexF32 {
    fn from(c: Complex32) -> Self {
        PodComplexF32 { re: c.re, im: c.im }
    }
}

impl From<PodComplexF32> for Complex32 {
    fn from(p: PodComplexF32) -> Self {
        Complex32 { re: p.re, im: p.im }
    }
}

/// Cast a slice of `Complex<f32>` to a slice of `PodComplexF32` by reinterpreting
/// the underlying bytes.
///
/// # Safety
///
/// `Complex<f32>` is `repr(C)` with two `f32` fields, so the layouts agree; the
/// debug assertions check this on every call.
pub(crate) unsafe fn cast_complex_slice_to_pod_f32(src: &[Complex32]) -> &[PodComplexF32] {
    debug_assert_eq!(
        std::mem::size_of::<Complex32>(),
        std::mem::size_of::<PodComplexF32>()
    );
    debug_assert_eq!(
        std::mem::align_of::<Complex32>(),
        std::mem::align_of::<PodComplexF32>()
    );
    let byte_ptr = src.as_ptr() as *const u8;
    let byte_len = std::mem::size_of_val(src);
    let bytes = std::slice::from_raw_parts(byte_ptr, byte_len);
    bytemuck::cast_slice(bytes)
}

/// Bytes per complex element in a BART payload.
pub(crate) const ELEMENT_BYTES: usize = std::mem::size_of::<PodComplexF32>();

/// Encode values as little-endian interleaved `f32` pairs.
pub(crate) fn complex_to_le_bytes(values: &[Complex32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        // SAFETY: `Complex32` and `PodComplexF32` share the same `repr(C)` layout.
        let pods = unsafe { cast_complex_slice_to_pod_f32(values) };
        bytemuck::cast_slice::<PodComplexF32, u8>(pods).to_vec()
    } else {
        let mut bytes = Vec::with_capacity(values.len() * ELEMENT_BYTES);
        for v in values {
            bytes.extend_from_slice(&v.re.to_le_bytes());
            bytes.extend_from_slice(&v.im.to_le_bytes());
        }
        bytes
    }
}

/// Decode little-endian interleaved `f32` pairs.
///
/// The caller guarantees `bytes.len()` is a multiple of [`ELEMENT_BYTES`].
pub(crate) fn complex_from_le_bytes(bytes: &[u8]) -> Vec<Complex32> {
    debug_assert_eq!(bytes.len() % ELEMENT_BYTES, 0);
    bytes
        .chunks_exact(ELEMENT_BYTES)
        .map(|chunk| {
            let pod = PodComplexF32 {
                re: f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                im: f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
            };
            Complex32::from(pod)
        })
        .collect()
}
