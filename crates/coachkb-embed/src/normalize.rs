/// Scales `v` to unit L2 norm in place. A zero vector is left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let divisor = if norm == 0.0 { 1.0 } else { norm };
    for x in v.iter_mut() {
        *x /= divisor;
    }
}

pub fn l2_normalized(mut v: Vec<f32>) -> Vec<f32> {
    l2_normalize(&mut v);
    v
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
