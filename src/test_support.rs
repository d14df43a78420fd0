use crate::classifier::ForestParams;
use crate::config::{NumericFallback, TrainingConfig};
use crate::dataset::from_reader;
use crate::predictor::Predictor;
use crate::schema::{
    ATTENDANCE_RATE, EXTRACURRICULAR, PARENT_EDUCATION, PREVIOUS_GRADES, STUDY_HOURS, Schema,
};
use crate::trainer::Trainer;

pub const SAMPLE_CSV: &str = "Student ID,Study Hours per Week,Attendance Rate,Previous Grades,Participation in Extracurricular Activities,Parent Education Level,Passed
S1,20,95,90,Yes,Master,Yes
S2,18,90,85,Yes,Bachelor,Yes
S3,2,40,30,No,High School,No
S4,3,50,35,No,Associate,No
S5,25,98,92,No,Doctorate,Yes
S6,1,30,40,Yes,High School,No
S7,15,85,80,No,Bachelor,Yes
S8,4,55,45,Yes,Associate,No
S9,12,,75,,Master,Yes
S10,5,60,,No,Bachelor,
";

pub fn trained_predictor(fallback: NumericFallback) -> Predictor {
    let schema = Schema::default();
    let data = from_reader(SAMPLE_CSV.as_bytes(), &schema).unwrap();
    let config = TrainingConfig {
        forest: ForestParams {
            n_trees: 25,
            ..Default::default()
        },
        ..TrainingConfig::default()
    };
    let (bundle, _) = Trainer::new(schema, config).unwrap().train(&data).unwrap();
    Predictor::new(bundle, fallback)
}

pub fn scenario_a() -> Vec<(&'static str, &'static str)> {
    vec![
        (STUDY_HOURS, "15"),
        (ATTENDANCE_RATE, "90"),
        (PREVIOUS_GRADES, "85"),
        (EXTRACURRICULAR, "Yes"),
        (PARENT_EDUCATION, "Bachelor"),
    ]
}
