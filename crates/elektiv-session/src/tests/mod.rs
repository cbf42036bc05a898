//! Integration-style tests against an in-process mock backend.


mod logout;
