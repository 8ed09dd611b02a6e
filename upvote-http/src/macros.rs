/// Response helper macros

#[macro_export]
macro_rules! text {
    ($body:expr) => {
        $crate::Response::text($crate::StatusCode::Ok, $body)
    };
    ($status:expr, $body:expr) => {
        $crate::Response::text($status, $body)
    };
}

#[macro_export]
macro_rules! html {
    ($body:expr) => {
        $crate::Response::html($crate::StatusCode::Ok, $body)
    };
    ($status:expr, $body:expr) => {
        $crate::Response::html($status, $body)
    };
}

#[macro_export]
macro_rules! json {
    ($data:expr) => {
        $crate::Response::json($crate::StatusCode::Ok, &$data)
    };
    ($status:expr, $data:expr) => {
        $crate::Response::json($status, &$data)
    };
}
