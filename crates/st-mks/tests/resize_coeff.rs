// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use approx::assert_abs_diff_eq;
use ndarray::{array, Array, Array2, ArrayD, Axis, IxDyn};
use rand::{rngs::StdRng, SeedableRng};
use st_mks::synth::{convolve_response, random_microstructure};
use st_mks::{BasisDescriptor, Filter, FilterError, LocalizationModel, MksError};

fn basis() -> BasisDescriptor {
    BasisDescriptor::primitive(2, Some((0.0, 1.0))).unwrap()
}

/// Real-space kernel `(5, 4, 2)`: state 0 counts 0..20 row by row, state 1 is
/// all ones.
fn counting_kernel() -> ArrayD<f64> {
    let counts = Array::from_shape_fn((5, 4), |(i, j)| (i * 4 + j) as f64);
    let ones = Array2::<f64>::ones((5, 4));
    ndarray::stack(Axis(2), &[counts.view(), ones.view()])
        .unwrap()
        .into_dyn()
}

fn model_with_counting_kernel() -> LocalizationModel {
    let filter = Filter::from_real_space_centered(&counting_kernel(), basis(), 1).unwrap();
    let mut model = LocalizationModel::new(basis()).unwrap().with_jobs(1);
    model.set_filter(filter).unwrap();
    model
}

#[test]
fn growing_pads_around_the_centred_kernel() {
    let mut model = model_with_counting_kernel();
    model.resize_coeff(&[10, 7]).unwrap();

    let coeff = model.coeff().unwrap();
    assert_eq!(coeff.shape(), &[10, 7, 2]);
    let expected = array![
        [0., 0., 0., 0., 0., 0., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
        [0., 0., 0., 1., 2., 3., 0.],
        [0., 0., 4., 5., 6., 7., 0.],
        [0., 0., 8., 9., 10., 11., 0.],
        [0., 0., 12., 13., 14., 15., 0.],
        [0., 0., 16., 17., 18., 19., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
        [0., 0., 0., 0., 0., 0., 0.],
    ];
    let state0 = coeff.index_axis(Axis(2), 0);
    for (a, e) in state0.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-10);
    }
    let ones: f64 = coeff.index_axis(Axis(2), 1).sum();
    assert_abs_diff_eq!(ones, 20.0, epsilon = 1e-10);
    assert_eq!(model.filter().unwrap().frequency_shape(), &[10, 4]);
}

#[test]
fn grow_then_shrink_restores_coefficients() {
    let mut model = model_with_counting_kernel();
    let before = model.coeff().unwrap();

    model.resize_coeff(&[9, 11]).unwrap();
    model.resize_coeff(&[5, 4]).unwrap();
    let after = model.coeff().unwrap();

    assert_eq!(after.shape(), before.shape());
    for (a, b) in after.iter().zip(before.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-10);
    }
}

#[test]
fn resizing_to_the_current_shape_is_a_no_op() {
    let mut model = model_with_counting_kernel();
    let before = model.coeff().unwrap();
    model.resize_coeff(&[5, 4]).unwrap();
    for (a, b) in model.coeff().unwrap().iter().zip(before.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-10);
    }
}

#[test]
fn resized_model_predicts_larger_fields() {
    let mut rng = StdRng::seed_from_u64(21);
    let mut kernel = ArrayD::<f64>::zeros(IxDyn(&[5, 5, 2]));
    kernel[[2, 2, 0]] = 1.5;
    kernel[[1, 2, 0]] = -0.5;
    kernel[[2, 3, 0]] = 0.25;

    let x = random_microstructure(&[25, 5, 5], basis().domain, &mut rng);
    let y = convolve_response(&kernel, &x, basis(), 1).unwrap();
    let mut model = LocalizationModel::new(basis()).unwrap().with_jobs(1);
    model.fit(&x, &y, None).unwrap();
    model.resize_coeff(&[9, 9]).unwrap();

    let mut padded = ArrayD::<f64>::zeros(IxDyn(&[9, 9, 2]));
    padded
        .slice_each_axis_mut(|ax| match ax.axis.index() {
            0 | 1 => ndarray::Slice::from(2..7),
            _ => ndarray::Slice::from(..),
        })
        .assign(&kernel);

    let large = random_microstructure(&[2, 9, 9], basis().domain, &mut rng);
    let expected = convolve_response(&padded, &large, basis(), 1).unwrap();
    let predicted = model.predict(&large).unwrap();
    assert_eq!(predicted.shape(), &[2, 9, 9]);
    for (a, e) in predicted.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-8);
    }
}

#[test]
fn invalid_sizes_leave_the_filter_alone() {
    let mut model = model_with_counting_kernel();
    assert!(matches!(
        model.resize_coeff(&[10]),
        Err(MksError::Filter(FilterError::ResizeRank {
            expected: 2,
            actual: 1
        }))
    ));
    assert!(matches!(
        model.resize_coeff(&[0, 3]),
        Err(MksError::Filter(FilterError::EmptyAxis { .. }))
    ));
    assert_eq!(model.coeff().unwrap().shape(), &[5, 4, 2]);

    let mut unfitted = LocalizationModel::new(basis()).unwrap();
    assert!(matches!(
        unfitted.resize_coeff(&[3, 3]),
        Err(MksError::NotFitted)
    ));
}
