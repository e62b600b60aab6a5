//! Inner-product kernels
//!
//! Explicit SIMD for aarch64 (NEON) and x86_64 (AVX2+FMA, detected at runtime),
//! with a scalar fallback that LLVM auto-vectorizes.
//!
//! The index ranks by raw inner product. For unit vectors that is cosine
//! similarity, so callers who want cosine ranking normalize before inserting
//! and before querying:
//! ```text
//! cos(θ) = A · B  when ||A|| = ||B|| = 1
//! ```

// ============================================================================
// aarch64 NEON
// ============================================================================

/// NEON dot product, 4 lanes per iteration
#[cfg(target_arch = "aarch64")]
#[inline(always)]
unsafe fn dot_product_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let n = a.len();
    let chunks = n / 4;

    let mut acc = vdupq_n_f32(0.0);
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = vld1q_f32(a_ptr.add(i * 4));
        let vb = vld1q_f32(b_ptr.add(i * 4));
        acc = vfmaq_f32(acc, va, vb);
    }

    let mut sum = vaddvq_f32(acc);
    for i in chunks * 4..n {
        sum += a[i] * b[i];
    }
    sum
}

// ============================================================================
// x86_64 AVX2+FMA
// ============================================================================

/// AVX2+FMA dot product, 8 lanes per iteration (unaligned loads)
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn dot_product_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let n = a.len();
    let chunks = n / 8;

    let mut acc = _mm256_setzero_ps();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let va = _mm256_loadu_ps(a_ptr.add(i * 8));
        let vb = _mm256_loadu_ps(b_ptr.add(i * 8));
        acc = _mm256_fmadd_ps(va, vb, acc);
    }

    // 8 lanes -> 1
    let hi = _mm256_extractf128_ps(acc, 1);
    let lo = _mm256_castps256_ps128(acc);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    let mut sum = _mm_cvtss_f32(_mm_add_ss(sums, shuf2));

    for i in chunks * 8..n {
        sum += a[i] * b[i];
    }
    sum
}

// ============================================================================
// Scalar fallback
// ============================================================================

#[inline(always)]
fn dot_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// ============================================================================
// Public dispatch
// ============================================================================

/// Inner product of two equal-length vectors.
///
/// Length agreement is the caller's contract; the index checks dimensions
/// before any vector reaches this function.
#[inline(always)]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");

    #[cfg(target_arch = "aarch64")]
    {
        // NEON is baseline on aarch64
        return unsafe { dot_product_neon(a, b) };
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { dot_product_avx2(a, b) };
        }
    }

    #[allow(unreachable_code)]
    dot_product_scalar(a, b)
}

/// Squared Euclidean norm, `v · v`
#[inline]
pub fn norm_squared(v: &[f32]) -> f32 {
    dot_product(v, v)
}

/// L2 normalize a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = norm_squared(v).sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2 normalize a vector, returning a new vector
pub fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    l2_normalize(&mut out);
    out
}

/// Whether `v` has unit length within `tolerance`
#[inline]
pub fn is_normalized(v: &[f32], tolerance: f32) -> bool {
    (norm_squared(v) - 1.0).abs() < tolerance
}
