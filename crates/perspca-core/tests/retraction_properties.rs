//! Property tests for Stiefel retractions and orthonormalization.

use perspca_core::prelude::*;
use proptest::prelude::*;

/// Random matrix with a unit diagonal bump so that the columns stay
/// linearly independent under shrinking.
fn well_conditioned_matrix(rows: usize, cols: usize) -> impl Strategy<Value = DMatrix<f64>> {
    prop::collection::vec(-0.1f64..0.1, rows * cols).prop_map(move |data| {
        let mut m = DMatrix::from_vec(rows, cols, data);
        for j in 0..cols {
            m[(j, j)] += 1.0;
        }
        m
    })
}

proptest! {
    #[test]
    fn retraction_produces_orthonormal_basis(m in well_conditioned_matrix(8, 3)) {
        for method in [RetractionMethod::Polar, RetractionMethod::Qr] {
            let q = retract(&m, method).unwrap();
            prop_assert_eq!(q.shape(), (8, 3));
            prop_assert!(is_orthonormal(&q, 1e-9));
        }
    }

    #[test]
    fn retraction_is_idempotent(m in well_conditioned_matrix(7, 4)) {
        for method in [RetractionMethod::Polar, RetractionMethod::Qr] {
            let once = retract(&m, method).unwrap();
            let twice = retract(&once, method).unwrap();
            prop_assert!((&once - &twice).norm() < 1e-9);
        }
    }

    #[test]
    fn polar_retraction_fixes_orthonormal_input(m in well_conditioned_matrix(9, 3)) {
        let q = retract(&m, RetractionMethod::Polar).unwrap();
        let again = retract(&q, RetractionMethod::Polar).unwrap();
        prop_assert!((&q - &again).norm() < 1e-9);
    }

    #[test]
    fn pair_correction_enforces_complement(
        u_raw in well_conditioned_matrix(10, 2),
        v_raw in well_conditioned_matrix(10, 3),
    ) {
        let u = retract(&u_raw, RetractionMethod::Polar).unwrap();
        let (_, v) = orthonormalize_pair(&u, &v_raw).unwrap();

        prop_assert!(is_orthonormal(&v, 1e-9));
        prop_assert!((u.transpose() * &v).norm() < 1e-8);
    }

    #[test]
    fn gram_schmidt_matches_span(m in well_conditioned_matrix(8, 3)) {
        let mut q = m.clone();
        gram_schmidt(&mut q).unwrap();

        prop_assert!(is_orthonormal(&q, 1e-8));
        // Same column span as the input: projecting the input onto the
        // orthonormalized basis reproduces it.
        let reprojected = &q * (q.transpose() * &m);
        prop_assert!((&reprojected - &m).norm() < 1e-8);
    }
}
