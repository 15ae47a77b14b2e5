use crate::assert_err;

#[derive(Debug)]
enum SampleError {
    Code(i32),
    Message(String),
    Range { low: usize, high: usize },
}

fn fail(error: SampleError) -> Result<(), SampleError> {
    Err(error)
}

#[test]
fn test_assert_err_forms() {
    assert_err!(fail(SampleError::Code(3)));
    assert_err!(fail(SampleError::Code(3)), SampleError::Code(3));
    assert_err!(
        fail(SampleError::Message("坏了".to_string())),
        SampleError::Message("坏了")
    );
    assert_err!(fail(SampleError::Range { low: 1, high: 5 }), SampleError::Range { .. });
    assert_err!(
        fail(SampleError::Range { low: 1, high: 5 }),
        SampleError::Range { high, .. } if *high == 5
    );
}

#[test]
#[should_panic(expected = "错误内容不匹配")]
fn test_assert_err_wrong_value() {
    assert_err!(fail(SampleError::Code(3)), SampleError::Code(4));
}

#[test]
#[should_panic(expected = "实际得到 Ok")]
fn test_assert_err_on_ok() {
    let ok: Result<i32, SampleError> = Ok(1);
    assert_err!(ok, SampleError::Code(1));
}
