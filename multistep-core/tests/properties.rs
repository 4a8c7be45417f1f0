use multistep_core::{
    general_off_policy_returns_from_q_and_v, n_step_bootstrapped_returns, retrace_continuous,
    truncated_gae, Lambda, Layout,
};
use ndarray::{array, s, Array2, ArrayView2, Zip};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const BATCH_SIZE: usize = 4;
const SEQ_LEN: usize = 7;

fn random_array(rng: &mut SmallRng, shape: (usize, usize), lo: f64, hi: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| rng.gen_range(lo..hi))
}

fn assert_close(a: ArrayView2<f64>, b: ArrayView2<f64>) {
    assert_eq!(a.dim(), b.dim());
    Zip::from(a).and(b).for_each(|&x, &y| {
        assert!((x - y).abs() < 1e-9, "{} != {}", x, y);
    });
}

#[test]
fn test_gae_lambda_zero_is_td_residual() {
    let mut rng = SmallRng::seed_from_u64(42);
    let r = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -1.0, 1.0);
    let d = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let v = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN + 1), -5.0, 5.0);

    let (adv, tgt) = truncated_gae(
        r.view(),
        d.view(),
        Lambda::Scalar(0.0),
        v.view(),
        true,
        Layout::BatchMajor,
    )
    .unwrap();

    let td = &r + &(&d * &v.slice(s![.., 1..])) - &v.slice(s![.., ..SEQ_LEN]);
    assert_close(adv.view(), td.view());

    // Target values are values plus advantages, exactly.
    assert_eq!(tgt, &v.slice(s![.., ..SEQ_LEN]) + &adv);
}

#[test]
fn test_gae_lambda_one_is_monte_carlo_return() {
    let r = array![[1.0, 1.0, 1.0]];
    let d = array![[0.9, 0.9, 0.9]];
    let v = array![[0.0, 0.0, 0.0, 0.0]];

    let (adv, _) = truncated_gae(
        r.view(),
        d.view(),
        Lambda::Scalar(1.0),
        v.view(),
        true,
        Layout::BatchMajor,
    )
    .unwrap();
    let g = n_step_bootstrapped_returns(
        r.view(),
        d.view(),
        v.slice(s![.., 1..]),
        3,
        Lambda::Scalar(1.0),
        true,
        Layout::BatchMajor,
    )
    .unwrap();

    assert_close(adv.view(), g.view());
    assert_close(adv.view(), array![[1.0 + 0.9 * 1.9, 1.9, 1.0]].view());
}

#[test]
fn test_n_step_with_one_step_is_one_step_bootstrap() {
    let mut rng = SmallRng::seed_from_u64(7);
    let r = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -1.0, 1.0);
    let d = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let v = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -5.0, 5.0);
    let l = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);

    let expected = &r + &(&d * &v);
    for lambda in [Lambda::Scalar(0.3), Lambda::PerStep(l.view())].iter() {
        let g = n_step_bootstrapped_returns(
            r.view(),
            d.view(),
            v.view(),
            1,
            *lambda,
            true,
            Layout::BatchMajor,
        )
        .unwrap();
        assert_close(g.view(), expected.view());
    }
}

#[test]
fn test_n_step_longer_than_sequence() {
    let r = array![[1.0, 1.0, 1.0, 1.0]];
    let d = array![[1.0, 1.0, 1.0, 1.0]];
    let v = array![[0.0, 0.0, 0.0, 0.0]];

    let g = n_step_bootstrapped_returns(
        r.view(),
        d.view(),
        v.view(),
        10,
        Lambda::Scalar(1.0),
        true,
        Layout::BatchMajor,
    )
    .unwrap();

    // Sum of the remaining rewards; padding adds neither reward nor value.
    assert_eq!(g, array![[4.0, 3.0, 2.0, 1.0]]);
}

#[test]
fn test_n_step_padding_repeats_last_value() {
    let r = array![[0.0, 0.0, 0.0]];
    let d = array![[0.5, 0.5, 0.5]];
    let v = array![[1.0, 2.0, 8.0]];

    let g = n_step_bootstrapped_returns(
        r.view(),
        d.view(),
        v.view(),
        5,
        Lambda::Scalar(1.0),
        true,
        Layout::BatchMajor,
    )
    .unwrap();

    // Discount products up to the end, then the last value with unit discounts.
    assert_eq!(g, array![[0.125 * 8.0, 0.25 * 8.0, 0.5 * 8.0]]);
}

#[test]
fn test_off_policy_terminal_condition() {
    let mut rng = SmallRng::seed_from_u64(3);
    let q = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN - 1), -5.0, 5.0);
    let v = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -5.0, 5.0);
    let r = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -1.0, 1.0);
    let d = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let expected = &r.column(SEQ_LEN - 1) + &(&d.column(SEQ_LEN - 1) * &v.column(SEQ_LEN - 1));

    for seed in 0..3 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let c = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN - 1), 0.0, 2.0);
        let g = general_off_policy_returns_from_q_and_v(
            q.view(),
            v.view(),
            r.view(),
            d.view(),
            c.view(),
            false,
            Layout::BatchMajor,
        )
        .unwrap();
        assert_eq!(g.column(SEQ_LEN - 1), expected);
    }
}

#[test]
fn test_on_policy_retrace_hand_computed() {
    // λ = 1 and ρ = 1 give c = 1; with v = q the backup is r + γG.
    let q_t = array![[2.0, 3.0]];
    let v_t = array![[2.0, 3.0, 4.0]];
    let r_t = array![[1.0, 2.0, 3.0]];
    let d = array![[0.5, 0.5, 0.5]];
    let log_rhos = array![[0.0, 0.0]];
    let q_tm1 = array![[1.0, 1.0, 1.0]];

    let err = retrace_continuous(
        q_tm1.view(),
        q_t.view(),
        v_t.view(),
        r_t.view(),
        d.view(),
        log_rhos.view(),
        Lambda::Scalar(1.0),
        true,
        Layout::BatchMajor,
    )
    .unwrap();

    // G₂ = 3 + 0.5 * 4 = 5, G₁ = 2 + 0.5 * 5 = 4.5, G₀ = 1 + 0.5 * 4.5 = 3.25
    assert_eq!(err, array![[2.25, 3.5, 4.0]]);
}

#[test]
fn test_stop_target_gradients_idempotent() {
    let mut rng = SmallRng::seed_from_u64(11);
    let r = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -1.0, 1.0);
    let d = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let v = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN + 1), -5.0, 5.0);

    let gae = |stop| {
        truncated_gae(
            r.view(),
            d.view(),
            Lambda::Scalar(0.95),
            v.view(),
            stop,
            Layout::BatchMajor,
        )
        .unwrap()
    };
    assert_eq!(gae(true), gae(true));
    assert_eq!(gae(true), gae(false));

    let n_step = |stop| {
        n_step_bootstrapped_returns(
            r.view(),
            d.view(),
            v.slice(s![.., 1..]),
            3,
            Lambda::Scalar(0.9),
            stop,
            Layout::BatchMajor,
        )
        .unwrap()
    };
    assert_eq!(n_step(true), n_step(true));
}

#[test]
fn test_layout_invariance() {
    let mut rng = SmallRng::seed_from_u64(5);
    let r = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), -1.0, 1.0);
    let d = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let v = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN + 1), -5.0, 5.0);
    let q = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN - 1), -5.0, 5.0);
    let l = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN), 0.0, 1.0);
    let log_rhos = random_array(&mut rng, (BATCH_SIZE, SEQ_LEN - 1), -2.0, 2.0);

    // GAE with a per-step lambda.
    let (adv_bm, tgt_bm) = truncated_gae(
        r.view(),
        d.view(),
        Lambda::PerStep(l.view()),
        v.view(),
        true,
        Layout::BatchMajor,
    )
    .unwrap();
    let (adv_tm, tgt_tm) = truncated_gae(
        r.t(),
        d.t(),
        Lambda::PerStep(l.t()),
        v.t(),
        true,
        Layout::TimeMajor,
    )
    .unwrap();
    assert_eq!(adv_bm.t(), adv_tm);
    assert_eq!(tgt_bm.t(), tgt_tm);

    // n-step returns.
    let v1 = v.slice(s![.., 1..]);
    let g_bm = n_step_bootstrapped_returns(
        r.view(),
        d.view(),
        v1,
        3,
        Lambda::PerStep(l.view()),
        true,
        Layout::BatchMajor,
    )
    .unwrap();
    let g_tm = n_step_bootstrapped_returns(
        r.t(),
        d.t(),
        v1.t(),
        3,
        Lambda::PerStep(l.t()),
        true,
        Layout::TimeMajor,
    )
    .unwrap();
    assert_eq!(g_bm.t(), g_tm);

    // Retrace.
    let q_tm1 = v.slice(s![.., ..SEQ_LEN]);
    let e_bm = retrace_continuous(
        q_tm1,
        q.view(),
        v1,
        r.view(),
        d.view(),
        log_rhos.view(),
        Lambda::Scalar(0.9),
        true,
        Layout::BatchMajor,
    )
    .unwrap();
    let e_tm = retrace_continuous(
        q_tm1.t(),
        q.t(),
        v1.t(),
        r.t(),
        d.t(),
        log_rhos.t(),
        Lambda::Scalar(0.9),
        true,
        Layout::TimeMajor,
    )
    .unwrap();
    assert_eq!(e_bm.t(), e_tm);
}
