use crate::load::FacultyLoad;

/// Number of faculty members per load, indexed by load.
pub fn load_histogram(loads: &[FacultyLoad]) -> Vec<usize> {
    let mut histogram = vec![0; loads.iter().map(|l| l.load + 1).max().unwrap_or(0)];
    for l in loads {
        histogram[l.load] += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FacultyId;

    #[test]
    fn histogram() {
        let loads = [0, 2, 2, 5]
            .iter()
            .zip(1..)
            .map(|(&l, id)| FacultyLoad::new(FacultyId(id), l))
            .collect::<Vec<_>>();
        assert_eq!(load_histogram(&loads), vec![1, 0, 2, 0, 0, 1]);
        assert!(load_histogram(&[]).is_empty());
    }
}
